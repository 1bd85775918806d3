// SPDX-License-Identifier: MPL-2.0

//! Hardware decoder detection for MJPEG input

use crate::gpu::CapabilityProbe;
use crate::media::roles::{ImplementationId, Role, RoleCapabilitySet};
use tracing::{debug, info};

/// Detect registered hardware JPEG decoders across all families
///
/// Does NOT include software decoders like `jpegdec`. The family gate is
/// not consulted; this is a raw inventory for reporting.
pub fn detect_hw_decoders<P: CapabilityProbe>(
    probe: &P,
    capabilities: &RoleCapabilitySet,
) -> Vec<ImplementationId> {
    debug!("Detecting available hardware decoders");
    let mut available = Vec::new();

    for family in capabilities.families() {
        for decoder in family.candidates(Role::Decoder) {
            if probe.has_element(decoder.as_str()) {
                info!("✓ {} ({}) available", decoder, family.family);
                available.push(decoder.clone());
            } else {
                debug!("✗ {} ({}) not available", decoder, family.family);
            }
        }
    }

    if available.is_empty() {
        info!("No hardware decoders available, will use software decoder");
    } else {
        info!("Found {} hardware decoder(s)", available.len());
    }

    available
}
