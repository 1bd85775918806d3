// SPDX-License-Identifier: GPL-3.0-only

//! Decode stage selection and tuning
//!
//! The camera delivers MJPEG, so every candidate here decodes JPEG. The
//! accelerated decoders come from [`RoleCapabilitySet`](super::RoleCapabilitySet);
//! this module owns the software tier and per-decoder properties.

mod hardware;

pub use hardware::detect_hw_decoders;

use super::roles::AccelerationFamily;
use super::resolver::ResolvedImpl;

/// Software JPEG decoders, most-preferred first
pub const SOFTWARE_DECODERS: &[&str] = &["jpegdec", "avdec_mjpeg"];

/// Properties to set on the decode stage
///
/// The NVIDIA V4L2 decoder only accepts JPEG input with `mjpeg=true`.
pub fn decoder_properties(decoder: Option<&ResolvedImpl>) -> Vec<(String, String)> {
    match decoder {
        Some(ResolvedImpl {
            id,
            family: AccelerationFamily::Nvidia,
        }) if id.as_str() == "nvv4l2decoder" => vec![("mjpeg".to_string(), "true".to_string())],
        _ => Vec::new(),
    }
}
