//! A pipeline instance: state plus the executor that advances it.

use super::state::PipelineState;
use crate::engine::service::BiasService;
use crate::engine::{PipelineError, StageExecutor};
use crate::model::{PipelineInput, ResultValue, Stage};

pub struct Pipeline<S> {
    state: PipelineState,
    executor: StageExecutor<S>,
}

impl<S: BiasService> Pipeline<S> {
    pub fn new(service: S, input: PipelineInput) -> Self {
        Self {
            state: PipelineState::new(input),
            executor: StageExecutor::new(service),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn set_input(&mut self, input: PipelineInput) {
        self.state.set_input(input);
    }

    pub fn executor(&self) -> &StageExecutor<S> {
        &self.executor
    }

    /// Run one stage to completion and commit its output.
    pub async fn run(&mut self, stage: Stage) -> Result<&ResultValue, PipelineError> {
        let req = self.state.begin(stage)?;
        match self.executor.run(req).await {
            Ok(output) => {
                tracing::info!(%stage, "stage completed");
                Ok(self.state.complete(output))
            }
            Err(e) => {
                tracing::warn!(%stage, error = %e, "stage failed");
                self.state.fail();
                Err(e)
            }
        }
    }
}
