// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};

/// Video encoder bitrate presets
///
/// The preset picks a target bitrate scaled by the capture resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitratePreset {
    /// Low bitrate - fewer shards per access unit, reduced quality
    Low,
    /// Medium bitrate - balanced quality and channel load (default)
    #[default]
    Medium,
    /// High bitrate - better quality, larger access units
    High,
}

impl BitratePreset {
    /// Get all preset variants
    pub const ALL: [BitratePreset; 3] = [
        BitratePreset::Low,
        BitratePreset::Medium,
        BitratePreset::High,
    ];

    /// Get display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            BitratePreset::Low => "Low",
            BitratePreset::Medium => "Medium",
            BitratePreset::High => "High",
        }
    }

    /// Get bitrate in kbps for a given resolution
    ///
    /// - SD (640x480): Low=1, Medium=2, High=4 Mbps
    /// - HD (1280x720): Low=2.5, Medium=5, High=10 Mbps
    /// - Full HD (1920x1080): Low=4, Medium=8, High=16 Mbps
    /// - 2K (2560x1440): Low=8, Medium=16, High=32 Mbps
    /// - 4K (3840x2160): Low=15, Medium=30, High=50 Mbps
    pub fn bitrate_kbps(&self, width: u32) -> u32 {
        match (get_resolution_tier(width), self) {
            (ResolutionTier::SD, BitratePreset::Low) => 1_000,
            (ResolutionTier::SD, BitratePreset::Medium) => 2_000,
            (ResolutionTier::SD, BitratePreset::High) => 4_000,
            (ResolutionTier::HD, BitratePreset::Low) => 2_500,
            (ResolutionTier::HD, BitratePreset::Medium) => 5_000,
            (ResolutionTier::HD, BitratePreset::High) => 10_000,
            (ResolutionTier::FullHD, BitratePreset::Low) => 4_000,
            (ResolutionTier::FullHD, BitratePreset::Medium) => 8_000,
            (ResolutionTier::FullHD, BitratePreset::High) => 16_000,
            (ResolutionTier::TwoK, BitratePreset::Low) => 8_000,
            (ResolutionTier::TwoK, BitratePreset::Medium) => 16_000,
            (ResolutionTier::TwoK, BitratePreset::High) => 32_000,
            (ResolutionTier::FourK, BitratePreset::Low) => 15_000,
            (ResolutionTier::FourK, BitratePreset::Medium) => 30_000,
            (ResolutionTier::FourK, BitratePreset::High) => 50_000,
        }
    }
}

/// Resolution tiers for bitrate calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    /// SD: 640x480 and below
    SD,
    /// HD: 1280x720
    HD,
    /// Full HD: 1920x1080
    FullHD,
    /// 2K: 2560x1440
    TwoK,
    /// 4K: 3840x2160 and above
    FourK,
}

/// Get the resolution tier for a given width
pub fn get_resolution_tier(width: u32) -> ResolutionTier {
    match width {
        w if w >= 3840 => ResolutionTier::FourK,
        w if w >= 2560 => ResolutionTier::TwoK,
        w if w >= 1920 => ResolutionTier::FullHD,
        w if w >= 1280 => ResolutionTier::HD,
        _ => ResolutionTier::SD,
    }
}

/// Camera capture defaults (native MJPEG mode of common UVC webcams)
pub mod capture {
    pub const DEFAULT_DEVICE: &str = "/dev/video0";
    pub const DEFAULT_WIDTH: u32 = 1280;
    pub const DEFAULT_HEIGHT: u32 = 720;
    pub const DEFAULT_FRAMERATE: u32 = 30;
}

/// Forward error correction constants
pub mod fec {
    /// Shard sizes are rounded up to this many bytes
    pub const SHARD_ALIGNMENT: usize = 16;

    /// Default number of data shards per access unit
    pub const DEFAULT_DATA_SHARDS: u32 = 10;

    /// Default number of parity shards per access unit
    pub const DEFAULT_PARITY_SHARDS: u32 = 4;

    /// GF(2^8) Cauchy construction needs distinct row indices below 256
    pub const MAX_TOTAL_SHARDS: u32 = 256;
}

/// PCI identifiers used for GPU vendor classification
pub mod pci {
    pub const VENDOR_INTEL: &str = "8086";
    pub const VENDOR_NVIDIA: &str = "10de";
    pub const VENDOR_AMD: &str = "1002";
    pub const VENDOR_AMD_ALT: &str = "1022";

    /// Display controller class prefix in sysfs (`0x03xxxx`)
    pub const DISPLAY_CLASS_PREFIX: &str = "0x03";

    /// Device class keywords that mark a display controller in `lspci` output
    pub const DISPLAY_KEYWORDS: &[&str] = &["vga", "3d", "display"];

    pub const SYSFS_DEVICES: &str = "/sys/bus/pci/devices";
}

/// GStreamer pipeline constants
pub mod pipeline {
    /// Keep at most this many access units queued in the hand-off sink
    pub const MAX_BUFFERS: u32 = 4;

    /// Default depth of the shard hand-off queue
    pub const SHARD_QUEUE_DEPTH: usize = 8;

    pub const SENDER_PIPELINE_NAME: &str = "SenderEngine";
    pub const PREVIEW_PIPELINE_NAME: &str = "CameraPreview";

    /// Name of the access-unit hand-off element
    pub const HANDOFF_STAGE: &str = "encoder_output";
}

/// Timing constants
pub mod timing {
    /// Access-unit counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Bus poll interval while running
    pub const BUS_POLL_MS: u64 = 100;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
