// SPDX-License-Identifier: MPL-2.0

//! Per-role selection of accelerated implementations
//!
//! Resolution is a strict two-tier fallback. The vendor picks one hardware
//! family; the family is only usable when its gate element is registered;
//! the first registered candidate for the role wins. Anything else yields
//! `None` and the topology builder substitutes a software stage. Families
//! are never mixed across vendors.

use super::roles::{AccelerationFamily, ImplementationId, Role, RoleCapabilitySet};
use crate::gpu::{CapabilityProbe, VendorClass};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// An implementation chosen for a role, tagged with its family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedImpl {
    pub id: ImplementationId,
    pub family: AccelerationFamily,
}

/// Start-up resolution result for every role
///
/// A missing role means no accelerated implementation was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedRoles {
    vendor: VendorClass,
    roles: BTreeMap<Role, ResolvedImpl>,
}

impl ResolvedRoles {
    pub fn vendor(&self) -> VendorClass {
        self.vendor
    }

    pub fn get(&self, role: Role) -> Option<&ResolvedImpl> {
        self.roles.get(&role)
    }

    pub fn id(&self, role: Role) -> Option<&ImplementationId> {
        self.get(role).map(|r| &r.id)
    }

    pub fn family(&self, role: Role) -> Option<AccelerationFamily> {
        self.get(role).map(|r| r.family)
    }

    /// True when no role has an accelerated implementation
    pub fn is_software_only(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &ResolvedImpl)> {
        self.roles.iter().map(|(role, resolved)| (*role, resolved))
    }
}

/// Resolves roles against a capability probe
pub struct RoleResolver<P> {
    probe: P,
    capabilities: RoleCapabilitySet,
}

impl<P: CapabilityProbe> RoleResolver<P> {
    pub fn new(probe: P) -> Self {
        Self::with_capabilities(probe, RoleCapabilitySet::standard())
    }

    pub fn with_capabilities(probe: P, capabilities: RoleCapabilitySet) -> Self {
        Self {
            probe,
            capabilities,
        }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn capabilities(&self) -> &RoleCapabilitySet {
        &self.capabilities
    }

    /// Whether a family's gate element is registered
    pub fn family_available(&self, family: AccelerationFamily) -> bool {
        self.capabilities
            .family(family)
            .is_some_and(|f| self.probe.has_element(f.gate.as_str()))
    }

    /// Best available implementation for one role, or `None` for software
    pub fn resolve(&self, role: Role, vendor: VendorClass) -> Option<ImplementationId> {
        self.resolve_tagged(role, vendor).map(|r| r.id)
    }

    fn resolve_tagged(&self, role: Role, vendor: VendorClass) -> Option<ResolvedImpl> {
        let family = AccelerationFamily::for_vendor(vendor)?;
        if !self.family_available(family) {
            debug!(%vendor, %family, %role, "Acceleration family not registered");
            return None;
        }
        self.first_present(family, role)
    }

    fn first_present(&self, family: AccelerationFamily, role: Role) -> Option<ResolvedImpl> {
        let found = self
            .capabilities
            .candidates(family, role)
            .iter()
            .find(|id| self.probe.has_element(id.as_str()))
            .cloned();

        match &found {
            Some(id) => debug!(%family, %role, implementation = %id, "Role resolved"),
            None => debug!(%family, %role, "No registered candidate"),
        }

        found.map(|id| ResolvedImpl { id, family })
    }

    /// Resolve every role for a vendor
    ///
    /// PostProcess, Encoder and DisplaySink are resolved first. The decoder
    /// then follows whichever hardware family those roles landed on, so the
    /// decode output stays in memory the downstream stages can consume.
    pub fn resolve_all(&self, vendor: VendorClass) -> ResolvedRoles {
        let mut roles = BTreeMap::new();

        for role in [Role::PostProcess, Role::Encoder, Role::DisplaySink] {
            if let Some(resolved) = self.resolve_tagged(role, vendor) {
                roles.insert(role, resolved);
            }
        }

        let pinned = roles.values().map(|r| r.family).find(|f| f.is_hardware());
        let decoder = match pinned {
            Some(family) => {
                let decoder = self.first_present(family, Role::Decoder);
                if decoder.is_none() {
                    warn!(
                        %family,
                        "Downstream stages are accelerated but no decoder of that family is registered"
                    );
                }
                decoder
            }
            None => self.resolve_tagged(Role::Decoder, vendor),
        };
        if let Some(decoder) = decoder {
            roles.insert(Role::Decoder, decoder);
        }

        let resolved = ResolvedRoles { vendor, roles };
        info!(
            %vendor,
            decoder = %display_choice(&resolved, Role::Decoder),
            encoder = %display_choice(&resolved, Role::Encoder),
            postproc = %display_choice(&resolved, Role::PostProcess),
            sink = %display_choice(&resolved, Role::DisplaySink),
            "Roles resolved"
        );
        resolved
    }
}

fn display_choice(resolved: &ResolvedRoles, role: Role) -> &str {
    resolved.id(role).map_or("software", ImplementationId::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::StaticProbe;

    const VAAPI_FULL: [&str; 4] = ["vaapidecodebin", "vaapih264enc", "vaapipostproc", "vaapisink"];

    #[test]
    fn test_intel_prefers_vaapi_over_generic() {
        let probe = StaticProbe::new(VAAPI_FULL.iter().copied().chain(["jpegdec"]));
        let resolver = RoleResolver::new(probe);
        let decoder = resolver.resolve(Role::Decoder, VendorClass::IntelIntegrated);
        assert_eq!(decoder.as_ref().map(ImplementationId::as_str), Some("vaapidecodebin"));
    }

    #[test]
    fn test_amd_uses_vaapi() {
        let resolver = RoleResolver::new(StaticProbe::new(VAAPI_FULL));
        let encoder = resolver.resolve(Role::Encoder, VendorClass::Amd);
        assert_eq!(encoder.as_ref().map(ImplementationId::as_str), Some("vaapih264enc"));
    }

    #[test]
    fn test_gate_missing_disables_family() {
        // VAAPI encoder registered, but the decode-bin gate is not
        let probe = StaticProbe::new(["vaapih264enc", "vaapisink"]);
        let resolver = RoleResolver::new(probe);
        for role in Role::ALL {
            assert_eq!(resolver.resolve(role, VendorClass::IntelIntegrated), None);
        }
    }

    #[test]
    fn test_no_cross_vendor_mixing() {
        let probe = StaticProbe::new(["nvv4l2decoder", "nvh264enc", "nveglglessink"]);
        let resolver = RoleResolver::new(probe);
        assert_eq!(resolver.resolve(Role::Encoder, VendorClass::Amd), None);
        assert_eq!(resolver.resolve(Role::Encoder, VendorClass::Unknown), None);
    }

    #[test]
    fn test_nvidia_sink_preference() {
        let both = StaticProbe::new(["nvv4l2decoder", "nveglglessink", "nv3dsink"]);
        let resolver = RoleResolver::new(both);
        assert_eq!(
            resolver
                .resolve(Role::DisplaySink, VendorClass::Nvidia)
                .map(|id| id.to_string()),
            Some("nveglglessink".to_string())
        );

        let only_3d = StaticProbe::new(["nvv4l2decoder", "nv3dsink"]);
        let resolver = RoleResolver::new(only_3d);
        assert_eq!(
            resolver
                .resolve(Role::DisplaySink, VendorClass::Nvidia)
                .map(|id| id.to_string()),
            Some("nv3dsink".to_string())
        );
    }

    #[test]
    fn test_nothing_accelerated_resolves_to_none() {
        let resolver = RoleResolver::new(StaticProbe::default());
        for vendor in [
            VendorClass::Unknown,
            VendorClass::IntelIntegrated,
            VendorClass::Nvidia,
            VendorClass::Amd,
        ] {
            let resolved = resolver.resolve_all(vendor);
            assert!(resolved.is_software_only(), "{} resolved something", vendor);
        }
    }

    #[test]
    fn test_decoder_pinned_to_downstream_family() {
        // Gate on the post-processor so the decode-bin can be absent
        let mut families = RoleCapabilitySet::standard().families().to_vec();
        for family in &mut families {
            if family.family == AccelerationFamily::Vaapi {
                family.gate = ImplementationId::from_static("vaapipostproc");
            }
        }
        let probe = StaticProbe::new(["vaapijpegdec", "vaapipostproc"]);
        let resolver = RoleResolver::with_capabilities(probe, RoleCapabilitySet::new(families));
        let resolved = resolver.resolve_all(VendorClass::IntelIntegrated);

        assert_eq!(resolved.family(Role::PostProcess), Some(AccelerationFamily::Vaapi));
        assert_eq!(
            resolved.id(Role::Decoder).map(ImplementationId::as_str),
            Some("vaapijpegdec")
        );
        assert_eq!(resolved.get(Role::Encoder), None);
    }

    #[test]
    fn test_full_nvidia_resolution() {
        let probe = StaticProbe::new([
            "nvv4l2decoder",
            "nvh264enc",
            "nvvideoconvert",
            "nveglglessink",
        ]);
        let resolved = RoleResolver::new(probe).resolve_all(VendorClass::Nvidia);
        assert_eq!(resolved.vendor(), VendorClass::Nvidia);
        for role in Role::ALL {
            assert_eq!(resolved.family(role), Some(AccelerationFamily::Nvidia));
        }
        assert_eq!(
            resolved.id(Role::Decoder).map(ImplementationId::as_str),
            Some("nvv4l2decoder")
        );
    }
}
