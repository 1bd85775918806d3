// SPDX-License-Identifier: MPL-2.0

//! Capability probing against the media runtime's element registry

use crate::errors::PipelineError;
use gstreamer as gst;
use std::collections::HashSet;

/// Answers whether a named implementation can be loaded
///
/// Probing is a pure query: unknown names return `false`.
pub trait CapabilityProbe {
    fn has_element(&self, name: &str) -> bool;
}

/// Probe backed by the GStreamer plugin registry
#[derive(Debug, Clone, Copy)]
pub struct GstRegistryProbe {
    _initialized: (),
}

impl GstRegistryProbe {
    /// Initialize GStreamer and return a probe over its registry
    pub fn new() -> Result<Self, PipelineError> {
        gst::init()?;
        Ok(Self { _initialized: () })
    }
}

impl CapabilityProbe for GstRegistryProbe {
    fn has_element(&self, name: &str) -> bool {
        gst::ElementFactory::find(name).is_some()
    }
}

/// Fixed set of available element names
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    available: HashSet<String>,
}

impl StaticProbe {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            available: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.available.insert(name.into());
    }
}

impl CapabilityProbe for StaticProbe {
    fn has_element(&self, name: &str) -> bool {
        self.available.contains(name)
    }
}

impl<P: CapabilityProbe + ?Sized> CapabilityProbe for &P {
    fn has_element(&self, name: &str) -> bool {
        (**self).has_element(name)
    }
}
