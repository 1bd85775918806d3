// SPDX-License-Identifier: MPL-2.0

//! Pipeline roles and the accelerated implementations that can fill them

use crate::gpu::VendorClass;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// One of the four pipeline functions that capability resolution is done for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Decoder,
    Encoder,
    PostProcess,
    DisplaySink,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Decoder,
        Role::Encoder,
        Role::PostProcess,
        Role::DisplaySink,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Decoder => "decoder",
            Role::Encoder => "encoder",
            Role::PostProcess => "postproc",
            Role::DisplaySink => "sink",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Acceleration family an implementation belongs to
///
/// Resolved once; downstream code dispatches on this tag instead of
/// inspecting implementation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccelerationFamily {
    /// VA-API (Intel and AMD)
    Vaapi,
    /// NVIDIA codec/EGL plugins
    Nvidia,
    /// Generic CPU implementation
    Software,
}

impl AccelerationFamily {
    /// Hardware family served by a vendor, if any
    pub fn for_vendor(vendor: VendorClass) -> Option<Self> {
        match vendor {
            VendorClass::IntelIntegrated | VendorClass::Amd => Some(AccelerationFamily::Vaapi),
            VendorClass::Nvidia => Some(AccelerationFamily::Nvidia),
            VendorClass::Unknown => None,
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, AccelerationFamily::Software)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AccelerationFamily::Vaapi => "VAAPI",
            AccelerationFamily::Nvidia => "NVIDIA",
            AccelerationFamily::Software => "CPU",
        }
    }
}

impl fmt::Display for AccelerationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Name of an element factory in the media runtime
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImplementationId(Cow<'static, str>);

impl ImplementationId {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ImplementationId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for ImplementationId {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl AsRef<str> for ImplementationId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ImplementationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Candidates offered by one acceleration family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyCapabilities {
    pub family: AccelerationFamily,
    /// Element whose presence enables the family at all
    pub gate: ImplementationId,
    /// Per role, most-preferred first
    pub candidates: HashMap<Role, Vec<ImplementationId>>,
}

impl FamilyCapabilities {
    pub fn candidates(&self, role: Role) -> &[ImplementationId] {
        self.candidates.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Ordered candidate lists per role for every hardware family
///
/// Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCapabilitySet {
    families: Vec<FamilyCapabilities>,
}

impl Default for RoleCapabilitySet {
    fn default() -> Self {
        Self::standard()
    }
}

impl RoleCapabilitySet {
    pub fn new(families: Vec<FamilyCapabilities>) -> Self {
        Self { families }
    }

    /// Stock GStreamer VA-API and NVIDIA plugin names
    pub fn standard() -> Self {
        fn ids(names: &[&'static str]) -> Vec<ImplementationId> {
            names.iter().copied().map(ImplementationId::from).collect()
        }

        Self::new(vec![
            FamilyCapabilities {
                family: AccelerationFamily::Vaapi,
                gate: ImplementationId::from_static("vaapidecodebin"),
                candidates: HashMap::from([
                    (Role::Decoder, ids(&["vaapidecodebin", "vaapijpegdec"])),
                    (Role::Encoder, ids(&["vaapih264enc"])),
                    (Role::PostProcess, ids(&["vaapipostproc"])),
                    (Role::DisplaySink, ids(&["vaapisink"])),
                ]),
            },
            FamilyCapabilities {
                family: AccelerationFamily::Nvidia,
                gate: ImplementationId::from_static("nvv4l2decoder"),
                candidates: HashMap::from([
                    (Role::Decoder, ids(&["nvv4l2decoder", "nvjpegdec"])),
                    (Role::Encoder, ids(&["nvh264enc"])),
                    (Role::PostProcess, ids(&["nvvideoconvert"])),
                    (Role::DisplaySink, ids(&["nveglglessink", "nv3dsink"])),
                ]),
            },
        ])
    }

    pub fn family(&self, family: AccelerationFamily) -> Option<&FamilyCapabilities> {
        self.families.iter().find(|f| f.family == family)
    }

    pub fn families(&self) -> &[FamilyCapabilities] {
        &self.families
    }

    pub fn candidates(&self, family: AccelerationFamily, role: Role) -> &[ImplementationId] {
        self.family(family)
            .map(|f| f.candidates(role))
            .unwrap_or(&[])
    }
}
