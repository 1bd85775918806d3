// SPDX-License-Identifier: MPL-2.0

//! Media capability resolution
//!
//! Maps the detected GPU vendor onto concrete GStreamer element factories
//! for the four pipeline roles.
//!
//! # Modules
//!
//! - [`roles`]: role and family vocabulary, per-family candidate lists
//! - [`resolver`]: vendor-aware per-role selection
//! - [`decoders`]: software JPEG decoders and decoder tuning
//! - [`encoders`]: software H.264 encoders and encoder tuning
//! - [`detection`]: full capability inventory for reporting

pub mod decoders;
pub mod detection;
pub mod encoders;
pub mod resolver;
pub mod roles;

pub use detection::{CapabilityReport, log_capability_report, probe_capabilities};
pub use resolver::{ResolvedImpl, ResolvedRoles, RoleResolver};
pub use roles::{AccelerationFamily, ImplementationId, Role, RoleCapabilitySet};

use crate::gpu::CapabilityProbe;
use tracing::warn;

/// Generic display sinks, most-preferred first
pub const SOFTWARE_SINKS: &[&str] = &["autovideosink"];

/// Sink wrapper that overlays the measured frame rate
pub const FPS_OVERLAY_SINK: &str = "fpsdisplaysink";

/// Software implementations for a role, most-preferred first
///
/// Post-processing has no software variant; it is simply omitted.
pub fn software_candidates(role: Role) -> &'static [&'static str] {
    match role {
        Role::Decoder => decoders::SOFTWARE_DECODERS,
        Role::Encoder => encoders::SOFTWARE_ENCODERS,
        Role::PostProcess => &[],
        Role::DisplaySink => SOFTWARE_SINKS,
    }
}

/// Pick the software implementation substituted for an unresolved role
///
/// Returns the first registered candidate. When none is registered the
/// most-preferred name is returned anyway, so the builder reports it as
/// the stage that could not be instantiated.
pub fn software_fallback<P: CapabilityProbe>(probe: &P, role: Role) -> Option<ImplementationId> {
    let candidates = software_candidates(role);
    let present = candidates.iter().find(|name| probe.has_element(name));
    if present.is_none() && !candidates.is_empty() {
        warn!(%role, candidates = ?candidates, "No software implementation registered");
    }
    present
        .or_else(|| candidates.first())
        .map(|&name| ImplementationId::from_static(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::StaticProbe;

    #[test]
    fn test_software_fallback_order() {
        let probe = StaticProbe::new(["openh264enc", "avdec_mjpeg"]);
        assert_eq!(
            software_fallback(&probe, Role::Encoder).map(|id| id.to_string()),
            Some("openh264enc".to_string())
        );
        assert_eq!(
            software_fallback(&probe, Role::Decoder).map(|id| id.to_string()),
            Some("avdec_mjpeg".to_string())
        );
    }

    #[test]
    fn test_software_fallback_when_nothing_registered() {
        let probe = StaticProbe::default();
        assert_eq!(
            software_fallback(&probe, Role::DisplaySink).map(|id| id.to_string()),
            Some("autovideosink".to_string())
        );
        assert_eq!(software_fallback(&probe, Role::PostProcess), None);
    }
}
