// SPDX-License-Identifier: GPL-3.0-only

//! Preview variant: capture, decode and display only

use super::runtime::PipelineRuntime;
use super::topology::{StageGraph, Variant};
use crate::constants::pipeline;
use crate::errors::PipelineError;
use std::sync::atomic::AtomicBool;
use tracing::info;

pub struct PreviewEngine {
    runtime: PipelineRuntime,
}

impl PreviewEngine {
    pub fn new(graph: &StageGraph) -> Result<Self, PipelineError> {
        if graph.variant != Variant::Preview {
            return Err(PipelineError::InitializationFailed(
                "preview requires a preview stage graph".to_string(),
            ));
        }
        let runtime = PipelineRuntime::instantiate(graph, pipeline::PREVIEW_PIPELINE_NAME)?;
        info!("Preview pipeline ready");
        Ok(Self { runtime })
    }

    pub fn start(&self) -> Result<(), PipelineError> {
        self.runtime.start()
    }

    pub fn run_until(&self, stop: &AtomicBool) -> Result<(), PipelineError> {
        self.runtime.run_until(stop)
    }
}
