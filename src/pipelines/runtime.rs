// SPDX-License-Identifier: GPL-3.0-only

//! Instantiation and supervision of a stage graph in GStreamer

use super::topology::{Stage, StageGraph};
use crate::constants::timing;
use crate::errors::PipelineError;
use gstreamer as gst;
use gstreamer::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A running (or ready to run) GStreamer pipeline built from a graph
pub struct PipelineRuntime {
    pipeline: gst::Pipeline,
}

impl PipelineRuntime {
    /// Create every element, apply properties and caps, and link the graph
    pub fn instantiate(graph: &StageGraph, name: &str) -> Result<Self, PipelineError> {
        gst::init()?;
        let pipeline = gst::Pipeline::with_name(name);

        let main = make_chain(&pipeline, &graph.main)?;
        link_chain(&main)?;

        if let Some(branch) = &graph.branch {
            let tee = make_element(&branch.tee)?;
            add(&pipeline, &tee)?;
            if let Some(last) = main.last() {
                link(last, &tee)?;
            }

            for leg in [&branch.display, &branch.encode] {
                let elements = make_chain(&pipeline, leg)?;
                link_chain(&elements)?;
                if let Some(first) = elements.first() {
                    // Requests a new src pad on the tee
                    link(&tee, first)?;
                }
            }
        }

        info!(pipeline = name, "Pipeline instantiated");
        Ok(Self { pipeline })
    }

    pub fn element(&self, name: &str) -> Option<gst::Element> {
        self.pipeline.by_name(name)
    }

    /// Set the pipeline playing and surface errors raised while starting
    pub fn start(&self) -> Result<(), PipelineError> {
        info!("Starting pipeline");
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| PipelineError::StateChangeFailed(format!("to Playing: {}", e)))?;

        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| PipelineError::Runtime("No bus available".to_string()))?;
        if let Some(msg) = bus.timed_pop_filtered(
            gst::ClockTime::from_mseconds(500),
            &[gst::MessageType::Error, gst::MessageType::Warning],
        ) {
            match msg.view() {
                gst::MessageView::Error(err) => {
                    error!(
                        error = %err.error(),
                        debug = ?err.debug(),
                        source = ?err.src().map(|s| s.name()),
                        "GStreamer error during start"
                    );
                    return Err(PipelineError::Runtime(err.error().to_string()));
                }
                gst::MessageView::Warning(w) => {
                    warn!(
                        warning = %w.error(),
                        debug = ?w.debug(),
                        source = ?w.src().map(|s| s.name()),
                        "GStreamer warning during start"
                    );
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Pump the bus until end of stream, an error, or `stop` is raised
    pub fn run_until(&self, stop: &AtomicBool) -> Result<(), PipelineError> {
        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| PipelineError::Runtime("No bus available".to_string()))?;

        loop {
            if stop.load(Ordering::SeqCst) {
                info!("Stop requested");
                return self.shutdown();
            }

            let Some(msg) = bus.timed_pop_filtered(
                gst::ClockTime::from_mseconds(timing::BUS_POLL_MS),
                &[
                    gst::MessageType::Error,
                    gst::MessageType::Eos,
                    gst::MessageType::Warning,
                ],
            ) else {
                continue;
            };

            match msg.view() {
                gst::MessageView::Eos(_) => {
                    info!("End of stream");
                    self.set_null()?;
                    return Ok(());
                }
                gst::MessageView::Error(err) => {
                    let source = err.src().map(|s| s.name().to_string()).unwrap_or_default();
                    error!(
                        error = %err.error(),
                        debug = ?err.debug(),
                        source = %source,
                        "GStreamer error"
                    );
                    if let Err(e) = self.set_null() {
                        warn!(error = %e, "Failed to stop pipeline after error");
                    }
                    return Err(PipelineError::Runtime(format!(
                        "{}: {}",
                        source,
                        err.error()
                    )));
                }
                gst::MessageView::Warning(w) => {
                    warn!(
                        warning = %w.error(),
                        source = ?w.src().map(|s| s.name()),
                        "GStreamer warning"
                    );
                }
                _ => {}
            }
        }
    }

    /// Send EOS, wait briefly for it to drain, then stop
    pub fn shutdown(&self) -> Result<(), PipelineError> {
        if !self.pipeline.send_event(gst::event::Eos::new()) {
            warn!("Failed to send EOS event to pipeline");
        }

        if let Some(bus) = self.pipeline.bus() {
            let deadline = Instant::now() + Duration::from_secs(timing::STOP_TIMEOUT_SECS);
            while Instant::now() < deadline {
                let msg = bus.timed_pop_filtered(
                    gst::ClockTime::from_mseconds(timing::BUS_POLL_MS),
                    &[gst::MessageType::Eos, gst::MessageType::Error],
                );
                if msg.is_some() {
                    break;
                }
            }
        }

        self.set_null()
    }

    fn set_null(&self) -> Result<(), PipelineError> {
        self.pipeline
            .set_state(gst::State::Null)
            .map(|_| ())
            .map_err(|e| PipelineError::StateChangeFailed(format!("to Null: {}", e)))
    }
}

impl Drop for PipelineRuntime {
    fn drop(&mut self) {
        // Ensure pipeline is properly stopped to avoid GStreamer warnings
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

/// Shared stop flag raised by Ctrl+C
pub fn install_stop_handler() -> Result<Arc<AtomicBool>, PipelineError> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| PipelineError::Runtime(format!("Failed to install Ctrl+C handler: {}", e)))?;
    Ok(stop)
}

fn make_chain(pipeline: &gst::Pipeline, stages: &[Stage]) -> Result<Vec<gst::Element>, PipelineError> {
    stages
        .iter()
        .map(|stage| {
            let element = make_element(stage)?;
            add(pipeline, &element)?;
            Ok(element)
        })
        .collect()
}

fn make_element(stage: &Stage) -> Result<gst::Element, PipelineError> {
    let element = gst::ElementFactory::make(stage.factory.as_str())
        .name(stage.name.as_str())
        .build()
        .map_err(|e| PipelineError::StageInstantiationFailed {
            stage: stage.name.clone(),
            factory: stage.factory.to_string(),
            reason: e.to_string(),
        })?;

    if let Some(spec) = &stage.caps {
        let caps = spec.to_string().parse::<gst::Caps>().map_err(|e| {
            PipelineError::StageInstantiationFailed {
                stage: stage.name.clone(),
                factory: stage.factory.to_string(),
                reason: format!("invalid caps {}: {}", spec, e),
            }
        })?;
        element.set_property("caps", &caps);
    }

    for (name, value) in &stage.properties {
        apply_property(&element, name, value);
    }

    if let Some(child) = &stage.child {
        let sink = make_element(child)?;
        if element.find_property("video-sink").is_some() {
            element.set_property("video-sink", &sink);
        } else {
            warn!(stage = %stage.name, "Element has no video-sink property, child ignored");
        }
    }

    debug!(stage = %stage.name, factory = %stage.factory, "Created element");
    Ok(element)
}

/// Set a property given in string form, skipping ones the element lacks
fn apply_property(element: &gst::Element, name: &str, value: &str) {
    let Some(pspec) = element.find_property(name) else {
        warn!(
            element = %element.name(),
            property = name,
            "Property not supported, skipping"
        );
        return;
    };

    match gst::glib::Value::deserialize(value, pspec.value_type()) {
        Ok(v) => element.set_property_from_value(name, &v),
        Err(e) => warn!(
            element = %element.name(),
            property = name,
            value,
            error = %e,
            "Could not parse property value, skipping"
        ),
    }
}

fn add(pipeline: &gst::Pipeline, element: &gst::Element) -> Result<(), PipelineError> {
    pipeline
        .add(element)
        .map_err(|e| PipelineError::Runtime(format!("Failed to add {}: {}", element.name(), e)))
}

fn link(from: &gst::Element, to: &gst::Element) -> Result<(), PipelineError> {
    from.link(to).map_err(|_| PipelineError::LinkFailed {
        from: from.name().to_string(),
        to: to.name().to_string(),
    })
}

fn link_chain(elements: &[gst::Element]) -> Result<(), PipelineError> {
    elements.windows(2).try_for_each(|pair| link(&pair[0], &pair[1]))
}
