// SPDX-License-Identifier: MPL-2.0

//! Capability inventory
//!
//! Probes every candidate of every family plus the software tier and
//! records which are registered. Used by the `detect` command and logged
//! at start-up.

use super::roles::{AccelerationFamily, ImplementationId, Role, RoleCapabilitySet};
use super::software_candidates;
use crate::gpu::CapabilityProbe;
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Presence of one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateStatus {
    pub id: ImplementationId,
    pub present: bool,
}

/// Candidates of one family for one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleStatus {
    pub role: Role,
    pub candidates: Vec<CandidateStatus>,
}

/// One family's inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyStatus {
    pub family: AccelerationFamily,
    pub gate: CandidateStatus,
    pub roles: Vec<RoleStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityReport {
    pub families: Vec<FamilyStatus>,
}

impl CapabilityReport {
    /// Families whose gate element is registered
    pub fn available_families(&self) -> impl Iterator<Item = AccelerationFamily> + '_ {
        self.families
            .iter()
            .filter(|f| f.gate.present)
            .map(|f| f.family)
    }
}

fn status<P: CapabilityProbe>(probe: &P, id: &ImplementationId) -> CandidateStatus {
    CandidateStatus {
        id: id.clone(),
        present: probe.has_element(id.as_str()),
    }
}

/// Probe every known implementation
pub fn probe_capabilities<P: CapabilityProbe>(
    probe: &P,
    capabilities: &RoleCapabilitySet,
) -> CapabilityReport {
    let mut families: Vec<FamilyStatus> = capabilities
        .families()
        .iter()
        .map(|family| FamilyStatus {
            family: family.family,
            gate: status(probe, &family.gate),
            roles: Role::ALL
                .iter()
                .map(|&role| RoleStatus {
                    role,
                    candidates: family
                        .candidates(role)
                        .iter()
                        .map(|id| status(probe, id))
                        .collect(),
                })
                .collect(),
        })
        .collect();

    families.push(FamilyStatus {
        family: AccelerationFamily::Software,
        gate: CandidateStatus {
            id: ImplementationId::from_static("(none)"),
            present: true,
        },
        roles: Role::ALL
            .iter()
            .map(|&role| RoleStatus {
                role,
                candidates: software_candidates(role)
                    .iter()
                    .map(|&name| status(probe, &ImplementationId::from_static(name)))
                    .collect(),
            })
            .collect(),
    });

    CapabilityReport { families }
}

/// Log the inventory (for debugging)
pub fn log_capability_report(report: &CapabilityReport) {
    info!("=== GStreamer Capability Detection ===");
    for family in &report.families {
        info!("{} (gate {}: {})", family.family, family.gate.id, mark(family.gate.present));
        for role in &family.roles {
            for candidate in &role.candidates {
                info!("  {} {} {}", mark(candidate.present), role.role, candidate.id);
            }
        }
    }
}

fn mark(present: bool) -> &'static str {
    if present { "✓" } else { "✗" }
}

impl fmt::Display for CapabilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for family in &self.families {
            if family.family.is_hardware() {
                writeln!(
                    f,
                    "{} [{} {}]",
                    family.family,
                    mark(family.gate.present),
                    family.gate.id
                )?;
            } else {
                writeln!(f, "{}", family.family)?;
            }
            for role in family.roles.iter().filter(|r| !r.candidates.is_empty()) {
                write!(f, "  {:<9}", role.role.display_name())?;
                for candidate in &role.candidates {
                    write!(f, " {} {}", mark(candidate.present), candidate.id)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
