pub mod service;

use crate::model::{AnalysisResponse, PipelineInput, ResultValue, Stage, StructuredAnalysis};
use service::{BiasService, ServiceError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Please enter a URL first")]
    MissingUri { stage: Stage },

    #[error("Please generate 'Enhanced Text' first")]
    MissingEnhancedText,

    #[error("{} is still running", .active.title())]
    Busy { requested: Stage, active: Stage },

    #[error("{stage} failed: {source}")]
    Remote {
        stage: Stage,
        #[source]
        source: ServiceError,
    },
}

impl PipelineError {
    /// Errors raised before any remote call was attempted.
    pub fn is_local(&self) -> bool {
        !matches!(self, PipelineError::Remote { .. })
    }
}

/// Everything a stage run needs, captured from the pipeline state when it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRequest {
    pub stage: Stage,
    pub input: PipelineInput,
    /// Only populated for `AnalyzeEnhanced`.
    pub enhanced_text: Option<String>,
}

/// Output of a successful stage run, before it is committed to the state.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Parsed(String),
    Analyzed(AnalysisResponse),
    Enhanced(String),
    EnhancedAnalyzed(StructuredAnalysis),
}

impl StageOutput {
    pub fn stage(&self) -> Stage {
        match self {
            StageOutput::Parsed(_) => Stage::Parse,
            StageOutput::Analyzed(_) => Stage::AnalyzeBias,
            StageOutput::Enhanced(_) => Stage::EnhanceText,
            StageOutput::EnhancedAnalyzed(_) => Stage::AnalyzeEnhanced,
        }
    }

    pub fn result_value(&self) -> ResultValue {
        match self {
            StageOutput::Parsed(text) | StageOutput::Enhanced(text) => {
                ResultValue::Text(text.clone())
            }
            StageOutput::Analyzed(resp) => {
                ResultValue::Structured(Box::new(resp.analysis.clone()))
            }
            StageOutput::EnhancedAnalyzed(a) => ResultValue::Structured(Box::new(a.clone())),
        }
    }
}

/// Runs one stage against the remote service. Holds no pipeline state of its own.
pub struct StageExecutor<S> {
    service: S,
}

impl<S: BiasService> StageExecutor<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn run(&self, req: StageRequest) -> Result<StageOutput, PipelineError> {
        let StageRequest {
            stage,
            input,
            enhanced_text,
        } = req;

        if stage.requires_uri() && input.trimmed_uri().is_empty() {
            return Err(PipelineError::MissingUri { stage });
        }
        let remote = |source: ServiceError| PipelineError::Remote { stage, source };

        match stage {
            Stage::Parse => {
                tracing::info!(uri = input.trimmed_uri(), "extracting page text");
                let text = self.service.extract(&input).await.map_err(remote)?;
                Ok(StageOutput::Parsed(text))
            }
            Stage::AnalyzeBias => {
                tracing::info!(uri = input.trimmed_uri(), "analyzing page for bias");
                let resp = self.service.analyze(&input).await.map_err(remote)?;
                Ok(StageOutput::Analyzed(resp))
            }
            Stage::EnhanceText => {
                // Always a fresh analysis of the current URL; the stored one may be stale.
                tracing::info!(uri = input.trimmed_uri(), "analyzing page before enhancement");
                let analysis = self.service.analyze(&input).await.map_err(remote)?;
                tracing::info!(uri = input.trimmed_uri(), "enhancing page text");
                let text = self.service.enhance(&analysis).await.map_err(remote)?;
                Ok(StageOutput::Enhanced(text))
            }
            Stage::AnalyzeEnhanced => {
                let text = enhanced_text
                    .filter(|t| !t.is_empty())
                    .ok_or(PipelineError::MissingEnhancedText)?;
                tracing::info!(chars = text.chars().count(), "analyzing enhanced text");
                let a = self.service.analyze_text(&text).await.map_err(remote)?;
                Ok(StageOutput::EnhancedAnalyzed(a))
            }
        }
    }
}
