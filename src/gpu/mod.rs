// SPDX-License-Identifier: GPL-3.0-only

//! GPU vendor detection
//!
//! The vendor is read from the PCI device list: `lspci -nn` first, the
//! sysfs PCI tree if `lspci` is missing. Only display-class controllers
//! (VGA, 3D, display) are considered. A host with no readable PCI list is
//! classified as [`VendorClass::Unknown`], which simply disables hardware
//! acceleration.

pub mod probe;

use crate::constants::pci;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

pub use probe::{CapabilityProbe, GstRegistryProbe, StaticProbe};

/// GPU vendor classification, fixed once at start-up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VendorClass {
    #[default]
    Unknown,
    IntelIntegrated,
    Nvidia,
    Amd,
}

impl VendorClass {
    /// Classify a 4-digit lowercase PCI vendor identifier
    pub fn from_pci_vendor(id: &str) -> Self {
        match id {
            pci::VENDOR_INTEL => VendorClass::IntelIntegrated,
            pci::VENDOR_NVIDIA => VendorClass::Nvidia,
            pci::VENDOR_AMD | pci::VENDOR_AMD_ALT => VendorClass::Amd,
            _ => VendorClass::Unknown,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VendorClass::Unknown => "Unknown",
            VendorClass::IntelIntegrated => "Intel",
            VendorClass::Nvidia => "NVIDIA",
            VendorClass::Amd => "AMD",
        }
    }

    /// Ranking used by [`VendorSelection::PreferDiscrete`]
    fn discrete_rank(&self) -> u8 {
        match self {
            VendorClass::Unknown => 0,
            VendorClass::IntelIntegrated => 1,
            VendorClass::Amd => 2,
            VendorClass::Nvidia => 3,
        }
    }
}

impl fmt::Display for VendorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How to reduce several display controllers to one vendor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VendorSelection {
    /// Last controller in enumeration order wins
    LastMatch,
    /// Discrete GPUs win over integrated ones (NVIDIA > AMD > Intel)
    #[default]
    PreferDiscrete,
}

impl VendorSelection {
    pub fn reduce(&self, vendors: &[VendorClass]) -> VendorClass {
        let known = vendors.iter().copied().filter(|v| *v != VendorClass::Unknown);
        let chosen = match self {
            VendorSelection::LastMatch => known.last(),
            VendorSelection::PreferDiscrete => known.max_by_key(VendorClass::discrete_rank),
        };
        chosen.unwrap_or_default()
    }
}

/// Detect the GPU vendor of this host
pub fn detect_vendor(selection: VendorSelection) -> VendorClass {
    let vendors = detect_vendors();
    let vendor = selection.reduce(&vendors);
    info!(vendor = %vendor, candidates = ?vendors, policy = ?selection, "GPU vendor detected");
    vendor
}

/// Vendors of every display controller, in enumeration order
pub fn detect_vendors() -> Vec<VendorClass> {
    match Command::new("lspci").arg("-nn").output() {
        Ok(output) if output.status.success() => {
            parse_lspci(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            warn!(status = ?output.status, "lspci failed, reading sysfs instead");
            scan_sysfs(Path::new(pci::SYSFS_DEVICES))
        }
        Err(e) => {
            debug!(error = %e, "lspci unavailable, reading sysfs instead");
            scan_sysfs(Path::new(pci::SYSFS_DEVICES))
        }
    }
}

/// Parse `lspci -nn` output into display controller vendors
pub fn parse_lspci(listing: &str) -> Vec<VendorClass> {
    listing
        .lines()
        .filter(|line| is_display_controller(line))
        .filter_map(pci_vendor_id)
        .map(VendorClass::from_pci_vendor)
        .filter(|v| *v != VendorClass::Unknown)
        .collect()
}

/// Match keywords against the device class only, not the slot or device name
fn is_display_controller(line: &str) -> bool {
    let class = line.split_once(": ").map_or(line, |(class, _)| class);
    let class = class.split_once(' ').map_or(class, |(_, class)| class);
    let lower = class.to_ascii_lowercase();
    pci::DISPLAY_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Vendor part of the last `[vvvv:dddd]` token on an `lspci -nn` line
fn pci_vendor_id(line: &str) -> Option<&str> {
    line.match_indices('[')
        .filter_map(|(start, _)| {
            let token = line.get(start + 1..start + 10)?;
            let (vendor, device) = token.split_once(':')?;
            let is_hex = |s: &str| s.len() == 4 && s.chars().all(|c| c.is_ascii_hexdigit());
            (is_hex(vendor) && is_hex(device.trim_end_matches(']'))).then_some(vendor)
        })
        .last()
}

/// Read display controller vendors from a sysfs-style PCI device tree
pub fn scan_sysfs(root: &Path) -> Vec<VendorClass> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %root.display(), error = %e, "PCI device list unavailable");
            return Vec::new();
        }
    };

    let mut devices: Vec<_> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    // read_dir order is unspecified; sort so LastMatch stays stable
    devices.sort();

    devices
        .iter()
        .filter_map(|dev| {
            let class = std::fs::read_to_string(dev.join("class")).ok()?;
            if !class.trim().starts_with(pci::DISPLAY_CLASS_PREFIX) {
                return None;
            }
            let vendor = std::fs::read_to_string(dev.join("vendor")).ok()?;
            let id = vendor.trim().trim_start_matches("0x").to_ascii_lowercase();
            Some(VendorClass::from_pci_vendor(&id))
        })
        .filter(|v| *v != VendorClass::Unknown)
        .collect()
}
