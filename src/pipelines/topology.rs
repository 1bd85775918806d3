// SPDX-License-Identifier: GPL-3.0-only

//! Stage graph assembly from resolved roles
//!
//! The graph is a pure description: an ordered main path, and for the
//! streaming variant one tee with a display leg and an encode leg. No
//! GStreamer objects are created here; every factory is checked against
//! the capability probe so a graph that builds can be instantiated.
//!
//! ```text
//! src ! mjpg_caps ! dec [! post] ! t
//!   t. ! q_disp ! sink
//!   t. ! q_enc [! enc_caps] ! enc ! parse ! encoder_output
//! ```

use crate::config::Config;
use crate::constants::pipeline;
use crate::errors::PipelineError;
use crate::gpu::CapabilityProbe;
use crate::media::decoders::decoder_properties;
use crate::media::encoders::{
    EncoderSettings, H264_PARSER, encoder_properties, parser_properties,
};
use crate::media::{
    AccelerationFamily, FPS_OVERLAY_SINK, ImplementationId, ResolvedImpl, ResolvedRoles, Role,
    software_fallback,
};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Elements every graph uses regardless of acceleration
pub const CORE_ELEMENTS: &[&str] = &["v4l2src", "capsfilter", "tee", "queue", "appsink"];

/// Which pipeline shape to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Variant {
    /// Capture and display only
    Preview,
    /// Display leg plus encode leg feeding the shard encoder
    Streaming,
}

/// What a stage does in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageKind {
    Source,
    CapsFilter,
    Decode,
    PostProcess,
    Tee,
    Queue,
    DisplaySink,
    Encode,
    Parse,
    HandOff,
}

/// Memory a raw video buffer lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemoryKind {
    System,
    VaSurface,
    Nvmm,
}

impl MemoryKind {
    /// Native device memory of a family, system memory for software
    pub fn native(family: AccelerationFamily) -> Self {
        match family {
            AccelerationFamily::Vaapi => MemoryKind::VaSurface,
            AccelerationFamily::Nvidia => MemoryKind::Nvmm,
            AccelerationFamily::Software => MemoryKind::System,
        }
    }

    fn caps_feature(&self) -> Option<&'static str> {
        match self {
            MemoryKind::System => None,
            MemoryKind::VaSurface => Some("memory:VASurface"),
            MemoryKind::Nvmm => Some("memory:NVMM"),
        }
    }
}

/// Format constraint attached to a caps filter or the hand-off stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CapsSpec {
    /// Camera-native MJPEG
    Jpeg {
        width: u32,
        height: u32,
        framerate: u32,
    },
    /// Raw video in the given memory
    Raw { memory: MemoryKind },
    /// Byte-stream H.264, one access unit per buffer
    H264AccessUnits,
}

impl fmt::Display for CapsSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapsSpec::Jpeg {
                width,
                height,
                framerate,
            } => write!(
                f,
                "image/jpeg,width={},height={},framerate={}/1",
                width, height, framerate
            ),
            CapsSpec::Raw { memory } => match memory.caps_feature() {
                Some(feature) => write!(f, "video/x-raw({})", feature),
                None => f.write_str("video/x-raw"),
            },
            CapsSpec::H264AccessUnits => {
                f.write_str("video/x-h264,stream-format=byte-stream,alignment=au")
            }
        }
    }
}

/// One processing stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub name: String,
    pub factory: ImplementationId,
    pub kind: StageKind,
    pub family: AccelerationFamily,
    pub caps: Option<CapsSpec>,
    /// Property name/value pairs, values in GStreamer string syntax
    pub properties: Vec<(String, String)>,
    /// Sink wrapped by this stage (FPS overlay)
    pub child: Option<Box<Stage>>,
}

impl Stage {
    fn new(name: &str, factory: ImplementationId, kind: StageKind) -> Self {
        Self {
            name: name.to_string(),
            factory,
            kind,
            family: AccelerationFamily::Software,
            caps: None,
            properties: Vec::new(),
            child: None,
        }
    }

    fn core(name: &str, factory: &'static str, kind: StageKind) -> Self {
        Self::new(name, ImplementationId::from_static(factory), kind)
    }

    fn with_family(mut self, family: AccelerationFamily) -> Self {
        self.family = family;
        self
    }

    fn with_caps(mut self, caps: CapsSpec) -> Self {
        self.caps = Some(caps);
        self
    }

    fn with_property(mut self, name: &str, value: impl Into<String>) -> Self {
        self.properties.push((name.to_string(), value.into()));
        self
    }

    fn with_properties(mut self, properties: Vec<(String, String)>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn launch_fragment(&self) -> String {
        let mut out = format!("{} name={}", self.factory, self.name);
        if let Some(caps) = &self.caps {
            out.push_str(&format!(" caps=\"{}\"", caps));
        }
        for (name, value) in &self.properties {
            out.push_str(&format!(" {}={}", name, value));
        }
        if let Some(child) = &self.child {
            out.push_str(&format!(" video-sink=\"{}\"", child.launch_fragment()));
        }
        out
    }
}

/// The two legs after the branch point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub tee: Stage,
    pub display: Vec<Stage>,
    pub encode: Vec<Stage>,
}

/// Ordered description of the processing graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageGraph {
    pub variant: Variant,
    pub main: Vec<Stage>,
    pub branch: Option<Branch>,
}

impl StageGraph {
    /// Every stage in link order, main path first, wrapped sinks included
    pub fn stages(&self) -> Vec<&Stage> {
        let mut out: Vec<&Stage> = self.main.iter().collect();
        if let Some(branch) = &self.branch {
            out.push(&branch.tee);
            out.extend(branch.display.iter());
            out.extend(branch.encode.iter());
        }
        let children: Vec<&Stage> = out.iter().filter_map(|s| s.child.as_deref()).collect();
        out.extend(children);
        out
    }

    pub fn find(&self, name: &str) -> Option<&Stage> {
        self.stages().into_iter().find(|s| s.name == name)
    }

    pub fn find_kind(&self, kind: StageKind) -> Option<&Stage> {
        self.stages().into_iter().find(|s| s.kind == kind)
    }

    /// True when no stage belongs to a hardware family
    pub fn is_software_only(&self) -> bool {
        self.stages().iter().all(|s| !s.family.is_hardware())
    }

    /// `gst-launch-1.0` style rendering, for display only
    pub fn launch_line(&self) -> String {
        let chain = |stages: &[Stage]| {
            stages
                .iter()
                .map(Stage::launch_fragment)
                .collect::<Vec<_>>()
                .join(" ! ")
        };

        let mut line = chain(&self.main);
        if let Some(branch) = &self.branch {
            let tee = &branch.tee.name;
            line.push_str(&format!(" ! {}", branch.tee.launch_fragment()));
            line.push_str(&format!("  {}. ! {}", tee, chain(&branch.display)));
            line.push_str(&format!("  {}. ! {}", tee, chain(&branch.encode)));
        }
        line
    }
}

impl fmt::Display for StageGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.launch_line())
    }
}

/// Capture and encoding parameters the builder needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologySettings {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub encoder: EncoderSettings,
    pub fps_overlay: bool,
}

impl From<&Config> for TopologySettings {
    fn from(config: &Config) -> Self {
        Self {
            device: config.device.clone(),
            width: config.capture.width,
            height: config.capture.height,
            framerate: config.capture.framerate,
            encoder: EncoderSettings {
                preset: config.bitrate_preset,
                width: config.capture.width,
                framerate: config.capture.framerate,
            },
            fps_overlay: config.fps_overlay,
        }
    }
}

/// Builds stage graphs from resolved roles
pub struct TopologyBuilder<'a, P> {
    probe: &'a P,
    settings: TopologySettings,
}

impl<'a, P: CapabilityProbe> TopologyBuilder<'a, P> {
    pub fn new(probe: &'a P, settings: TopologySettings) -> Self {
        Self { probe, settings }
    }

    /// Assemble the graph
    ///
    /// Fails if any stage's factory is not registered; there is no
    /// partial-pipeline mode.
    pub fn build(
        &self,
        resolved: &ResolvedRoles,
        variant: Variant,
    ) -> Result<StageGraph, PipelineError> {
        let s = &self.settings;
        let mut main = vec![
            Stage::core("src", "v4l2src", StageKind::Source).with_property("device", &s.device),
            Stage::core("mjpg_caps", "capsfilter", StageKind::CapsFilter).with_caps(
                CapsSpec::Jpeg {
                    width: s.width,
                    height: s.height,
                    framerate: s.framerate,
                },
            ),
        ];

        let decoder = resolved.get(Role::Decoder);
        main.push(
            self.role_stage("dec", Role::Decoder, StageKind::Decode, resolved)?
                .with_properties(decoder_properties(decoder)),
        );

        let postproc = resolved.get(Role::PostProcess);
        if let Some(post) = postproc {
            main.push(
                Stage::new("post", post.id.clone(), StageKind::PostProcess).with_family(post.family),
            );
        }

        let graph = match variant {
            Variant::Preview => {
                main.push(self.display_sink(resolved)?);
                StageGraph {
                    variant,
                    main,
                    branch: None,
                }
            }
            Variant::Streaming => {
                let branch = Branch {
                    tee: Stage::core("t", "tee", StageKind::Tee),
                    display: vec![
                        Stage::core("q_disp", "queue", StageKind::Queue),
                        self.display_sink(resolved)?,
                    ],
                    encode: self.encode_leg(resolved, postproc)?,
                };
                StageGraph {
                    variant,
                    main,
                    branch: Some(branch),
                }
            }
        };

        for stage in graph.stages() {
            self.require(stage)?;
        }

        info!(variant = ?variant, stages = graph.stages().len(), "Stage graph built");
        debug!(launch = %graph, "Stage graph");
        Ok(graph)
    }

    fn display_sink(&self, resolved: &ResolvedRoles) -> Result<Stage, PipelineError> {
        let sink = self.role_stage("sink", Role::DisplaySink, StageKind::DisplaySink, resolved)?;
        let sink = sink.with_property("sync", "false");

        if !self.settings.fps_overlay {
            return Ok(sink);
        }

        let mut overlay = Stage::core("fps", FPS_OVERLAY_SINK, StageKind::DisplaySink)
            .with_property("sync", "false")
            .with_property("text-overlay", "true");
        overlay.family = sink.family;
        overlay.child = Some(Box::new(sink));
        Ok(overlay)
    }

    fn encode_leg(
        &self,
        resolved: &ResolvedRoles,
        postproc: Option<&ResolvedImpl>,
    ) -> Result<Vec<Stage>, PipelineError> {
        let mut leg = vec![Stage::core("q_enc", "queue", StageKind::Queue)];

        let encoder = self.role_stage("enc", Role::Encoder, StageKind::Encode, resolved)?;

        // A hardware post-processor keeps frames in device memory; ask for
        // that memory on the encode leg when the encoder can take it.
        if let Some(post) = postproc.filter(|p| p.family.is_hardware()) {
            let memory = if encoder.family == post.family {
                MemoryKind::native(post.family)
            } else {
                MemoryKind::System
            };
            debug!(postproc = %post.id, encoder = %encoder.factory, memory = ?memory, "Encode leg memory");
            leg.push(
                Stage::core("enc_caps", "capsfilter", StageKind::CapsFilter)
                    .with_caps(CapsSpec::Raw { memory }),
            );
        }

        let tuning = encoder_properties(&encoder.factory, encoder.family, &self.settings.encoder);
        leg.push(encoder.with_properties(tuning));
        leg.push(
            Stage::core("parse", H264_PARSER, StageKind::Parse).with_properties(parser_properties()),
        );
        leg.push(
            Stage::core(pipeline::HANDOFF_STAGE, "appsink", StageKind::HandOff)
                .with_caps(CapsSpec::H264AccessUnits)
                .with_property("emit-signals", "true")
                .with_property("sync", "false")
                .with_property("max-buffers", pipeline::MAX_BUFFERS.to_string())
                .with_property("drop", "false"),
        );
        Ok(leg)
    }

    /// Stage for a role: the resolved implementation, or the software one
    fn role_stage(
        &self,
        name: &str,
        role: Role,
        kind: StageKind,
        resolved: &ResolvedRoles,
    ) -> Result<Stage, PipelineError> {
        if let Some(r) = resolved.get(role) {
            return Ok(Stage::new(name, r.id.clone(), kind).with_family(r.family));
        }

        let fallback = software_fallback(self.probe, role).ok_or_else(|| {
            PipelineError::StageInstantiationFailed {
                stage: name.to_string(),
                factory: String::new(),
                reason: format!("no implementation for role {}", role),
            }
        })?;
        debug!(%role, implementation = %fallback, "Using software implementation");
        Ok(Stage::new(name, fallback, kind))
    }

    fn require(&self, stage: &Stage) -> Result<(), PipelineError> {
        if self.probe.has_element(stage.factory.as_str()) {
            Ok(())
        } else {
            Err(PipelineError::StageInstantiationFailed {
                stage: stage.name.clone(),
                factory: stage.factory.to_string(),
                reason: "element not registered".to_string(),
            })
        }
    }
}
