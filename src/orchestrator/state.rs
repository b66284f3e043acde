//! Pipeline state: input, busy guard, current result and stored artifacts.

use crate::engine::{PipelineError, StageOutput, StageRequest};
use crate::model::{AnalysisResponse, PipelineInput, ResultValue, Stage};
use serde::Serialize;

/// Last successful output of each producing stage, kept for the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoredArtifacts {
    pub last_parsed_text: Option<String>,
    pub last_analysis: Option<AnalysisResponse>,
    pub last_enhanced_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineState {
    input: PipelineInput,
    busy: bool,
    active_stage: Option<Stage>,
    result: Option<ResultValue>,
    artifacts: StoredArtifacts,
}

impl PipelineState {
    pub fn new(input: PipelineInput) -> Self {
        Self {
            input,
            ..Default::default()
        }
    }

    pub fn input(&self) -> &PipelineInput {
        &self.input
    }

    /// Replace the input. A stage already in flight keeps the snapshot it started with.
    pub fn set_input(&mut self, input: PipelineInput) {
        self.input = input;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// The stage last invoked, whether it is still running or not.
    pub fn active_stage(&self) -> Option<Stage> {
        self.active_stage
    }

    pub fn result(&self) -> Option<&ResultValue> {
        self.result.as_ref()
    }

    pub fn artifacts(&self) -> &StoredArtifacts {
        &self.artifacts
    }

    /// Mark `stage` as in flight and snapshot what it needs.
    ///
    /// Fails with `Busy` and leaves the state untouched if another stage is running.
    pub fn begin(&mut self, stage: Stage) -> Result<StageRequest, PipelineError> {
        if self.busy {
            return Err(PipelineError::Busy {
                requested: stage,
                active: self.active_stage.unwrap_or(stage),
            });
        }
        self.busy = true;
        self.active_stage = Some(stage);

        let enhanced_text = match stage {
            Stage::AnalyzeEnhanced => self.artifacts.last_enhanced_text.clone(),
            _ => None,
        };
        Ok(StageRequest {
            stage,
            input: self.input.clone(),
            enhanced_text,
        })
    }

    /// Commit a successful run: result and artifact change together, busy clears.
    pub fn complete(&mut self, output: StageOutput) -> &ResultValue {
        let value = output.result_value();
        match output {
            StageOutput::Parsed(text) => self.artifacts.last_parsed_text = Some(text),
            StageOutput::Analyzed(resp) => self.artifacts.last_analysis = Some(resp),
            StageOutput::Enhanced(text) => self.artifacts.last_enhanced_text = Some(text),
            StageOutput::EnhancedAnalyzed(_) => {}
        }
        self.busy = false;
        self.result.insert(value)
    }

    /// End a failed run. Result and artifacts keep their previous values.
    pub fn fail(&mut self) {
        self.busy = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::analysis;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn state() -> PipelineState {
        PipelineState::new(PipelineInput::new("http://example.com", false))
    }

    #[test]
    fn begin_sets_busy_and_active_stage() {
        let mut s = state();
        assert!(!s.is_busy());
        assert_eq!(s.active_stage(), None);

        let req = s.begin(Stage::Parse).unwrap();

        assert!(s.is_busy());
        assert_eq!(s.active_stage(), Some(Stage::Parse));
        assert_eq!(req.input, PipelineInput::new("http://example.com", false));
        assert_eq!(req.enhanced_text, None);
    }

    #[test]
    fn second_begin_while_busy_changes_nothing() {
        let mut s = state();
        s.begin(Stage::AnalyzeBias).unwrap();
        let before = format!("{s:?}");

        let err = s.begin(Stage::Parse).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Busy {
                requested: Stage::Parse,
                active: Stage::AnalyzeBias
            }
        ));
        assert_eq!(format!("{s:?}"), before);
    }

    #[test]
    fn complete_updates_result_and_artifact_together() {
        let mut s = state();
        s.begin(Stage::EnhanceText).unwrap();

        let value = s.complete(StageOutput::Enhanced("rewritten".into())).clone();

        assert_eq!(value, ResultValue::Text("rewritten".into()));
        assert_eq!(s.result(), Some(&value));
        assert_eq!(
            s.artifacts().last_enhanced_text.as_deref(),
            Some("rewritten")
        );
        assert!(!s.is_busy());
        assert_eq!(s.active_stage(), Some(Stage::EnhanceText));
    }

    #[test]
    fn analysis_artifact_keeps_response_body() {
        let mut s = state();
        s.begin(Stage::AnalyzeBias).unwrap();
        let body = json!({ "uri": "http://example.com", "result": {}, "extra": 1 });
        s.complete(StageOutput::Analyzed(AnalysisResponse {
            body: body.clone(),
            analysis: analysis("x"),
        }));

        let stored = s.artifacts().last_analysis.as_ref().unwrap();
        assert_eq!(stored.body, body);
        assert!(matches!(s.result(), Some(ResultValue::Structured(_))));
    }

    #[test]
    fn failure_only_clears_busy() {
        let mut s = state();
        s.begin(Stage::Parse).unwrap();
        s.complete(StageOutput::Parsed("page".into()));
        let result_before = s.result().cloned();
        let artifacts_before = s.artifacts().clone();

        s.begin(Stage::Parse).unwrap();
        s.fail();

        assert!(!s.is_busy());
        assert_eq!(s.result().cloned(), result_before);
        assert_eq!(s.artifacts(), &artifacts_before);
    }

    #[test]
    fn analyze_enhanced_snapshots_enhanced_text() {
        let mut s = state();
        s.begin(Stage::EnhanceText).unwrap();
        s.complete(StageOutput::Enhanced("rewritten".into()));

        let req = s.begin(Stage::AnalyzeEnhanced).unwrap();
        assert_eq!(req.enhanced_text.as_deref(), Some("rewritten"));
    }

    #[test]
    fn rerun_overwrites_artifact() {
        let mut s = state();
        for text in ["first", "second"] {
            s.begin(Stage::Parse).unwrap();
            s.complete(StageOutput::Parsed(text.into()));
        }
        assert_eq!(s.artifacts().last_parsed_text.as_deref(), Some("second"));
        assert_eq!(s.result(), Some(&ResultValue::Text("second".into())));
    }
}
