// src/pipeline/resources.rs
//
// Release-exactly-once wrapper for run-scoped media handles. The happy
// paths call `release()` explicitly so the outcome can be logged before
// the terminal state goes out; `Drop` covers early returns and unwinding.

use crate::video::{VideoSink, VideoSource};
use anyhow::Result;
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

pub trait Releasable {
    fn release_resource(&mut self) -> Result<()>;
}

impl Releasable for Box<dyn VideoSource> {
    fn release_resource(&mut self) -> Result<()> {
        self.release()
    }
}

impl Releasable for Box<dyn VideoSink> {
    fn release_resource(&mut self) -> Result<()> {
        self.release()
    }
}

pub struct Scoped<R: Releasable> {
    name: &'static str,
    resource: R,
    released: bool,
}

impl<R: Releasable> Scoped<R> {
    pub fn new(name: &'static str, resource: R) -> Self {
        Self {
            name,
            resource,
            released: false,
        }
    }

    /// Releases the handle unless that already happened. Failures are
    /// logged and swallowed.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.resource.release_resource() {
            Ok(()) => debug!("Released {}", self.name),
            Err(e) => warn!("Failed to release {}: {:#}", self.name, e),
        }
    }
}

impl<R: Releasable> Deref for Scoped<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

impl<R: Releasable> DerefMut for Scoped<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.resource
    }
}

impl<R: Releasable> Drop for Scoped<R> {
    fn drop(&mut self) {
        self.release();
    }
}
