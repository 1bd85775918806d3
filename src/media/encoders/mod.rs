// SPDX-License-Identifier: MPL-2.0

//! Encode stage selection and configuration
//!
//! Accelerated encoders come from the role resolver; this module provides
//! the software tier and the per-implementation tuning applied to whichever
//! encoder lands in the encode leg.

pub mod video;

pub use video::{
    EncoderSettings, H264_PARSER, SOFTWARE_ENCODERS, encoder_properties, parser_properties,
};
