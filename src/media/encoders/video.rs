// SPDX-License-Identifier: MPL-2.0

//! H.264 encoder tuning for low-latency streaming
//!
//! Every encoder is configured for constant bitrate with a keyframe once per
//! second of capture, so a receiver that lost a whole access unit resyncs
//! quickly. Values are produced as strings and applied by the runtime only
//! when the element exposes the property.

use crate::constants::BitratePreset;
use crate::media::roles::{AccelerationFamily, ImplementationId};
use tracing::debug;

/// Software H.264 encoders, most-preferred first
pub const SOFTWARE_ENCODERS: &[&str] = &["x264enc", "openh264enc"];

/// Bitstream parser placed after every encoder
pub const H264_PARSER: &str = "h264parse";

/// Inputs for encoder tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    pub preset: BitratePreset,
    pub width: u32,
    pub framerate: u32,
}

impl EncoderSettings {
    pub fn bitrate_kbps(&self) -> u32 {
        self.preset.bitrate_kbps(self.width)
    }

    /// Keyframe interval in frames
    pub fn keyframe_interval(&self) -> u32 {
        self.framerate.max(1)
    }

    /// x264 speed preset; all real-time capable
    fn x264_preset(&self) -> &'static str {
        match self.preset {
            BitratePreset::Low => "ultrafast",
            BitratePreset::Medium => "superfast",
            BitratePreset::High => "veryfast",
        }
    }
}

/// Encoder properties for the given implementation
pub fn encoder_properties(
    id: &ImplementationId,
    family: AccelerationFamily,
    settings: &EncoderSettings,
) -> Vec<(String, String)> {
    let bitrate = settings.bitrate_kbps();
    let gop = settings.keyframe_interval();

    let props: Vec<(&str, String)> = match family {
        AccelerationFamily::Vaapi => vec![
            ("rate-control", "cbr".into()),
            ("bitrate", bitrate.to_string()),
            ("keyframe-period", gop.to_string()),
            ("tune", "high-compression".into()),
        ],
        AccelerationFamily::Nvidia => vec![
            ("preset", "low-latency-hq".into()),
            ("rc-mode", "cbr".into()),
            ("bitrate", bitrate.to_string()),
            ("gop-size", gop.to_string()),
            ("zerolatency", "true".into()),
        ],
        AccelerationFamily::Software => match id.as_str() {
            "x264enc" => vec![
                ("tune", "zerolatency".into()),
                ("speed-preset", settings.x264_preset().into()),
                ("bitrate", bitrate.to_string()),
                ("key-int-max", gop.to_string()),
            ],
            "openh264enc" => vec![
                ("rate-control", "bitrate".into()),
                // Bits per second
                ("bitrate", (bitrate * 1000).to_string()),
                ("usage-type", "camera".into()),
                ("gop-size", gop.to_string()),
            ],
            _ => {
                debug!(encoder = %id, "Unknown encoder type, using default configuration");
                Vec::new()
            }
        },
    };

    debug!(
        encoder = %id,
        %family,
        preset = settings.preset.display_name(),
        bitrate_kbps = bitrate,
        keyframe_interval = gop,
        "Encoder tuning"
    );

    props
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Parser properties: repeat SPS/PPS with every IDR
pub fn parser_properties() -> Vec<(String, String)> {
    vec![("config-interval".to_string(), "-1".to_string())]
}
