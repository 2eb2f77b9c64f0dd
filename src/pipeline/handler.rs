//! Pipeline stages and the immutable chain that runs them.
//!
//! # Design Decisions
//! - Stages are an ordered `Vec`, not a linked list of wrappers
//! - The chain is frozen by `PipelineBuilder::build` and shared via `Arc`
//! - Stages hold no per-request state; everything lives on the `Exchange`
//! - A stage error propagates to the caller, which turns it into a response

use std::fmt;

use crate::error::GatewayResult;
use crate::pipeline::Exchange;

/// What a stage decided about the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Hand the exchange, unchanged in intent, to the next stage.
    Continue,
    /// The response is fully written; stop here.
    Terminated,
}

/// A single request-processing stage.
pub trait PipelineHandler: Send + Sync + fmt::Debug {
    /// Stage name used in logs.
    fn name(&self) -> &'static str;

    /// Either terminate the exchange or let it continue.
    fn process(&self, exchange: &mut Exchange) -> GatewayResult<Outcome>;
}

/// Ordered, immutable sequence of stages.
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn PipelineHandler>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Run the exchange through every stage until one terminates it.
    ///
    /// Returns `Outcome::Continue` when all stages passed, meaning the caller
    /// should forward the request upstream.
    pub fn process(&self, exchange: &mut Exchange) -> GatewayResult<Outcome> {
        for stage in &self.stages {
            let outcome = stage.process(exchange)?;
            if outcome == Outcome::Terminated || exchange.is_complete() {
                exchange.mark_complete();
                tracing::debug!(
                    stage = stage.name(),
                    status = %exchange.status(),
                    "Exchange terminated"
                );
                return Ok(Outcome::Terminated);
            }
        }
        Ok(Outcome::Continue)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct PipelineBuilder {
    stages: Vec<Box<dyn PipelineHandler>>,
}

impl PipelineBuilder {
    /// Append a stage; stages run in the order they are added.
    pub fn stage(mut self, handler: impl PipelineHandler + 'static) -> Self {
        self.stages.push(Box::new(handler));
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}
