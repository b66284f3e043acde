use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the remote analysis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Per-request bound. `None` waits for the service indefinitely.
    #[serde(default)]
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    #[value(name = "parse")]
    Parse,
    #[value(name = "analyze")]
    #[serde(rename = "analyze")]
    AnalyzeBias,
    #[value(name = "enhance")]
    #[serde(rename = "enhance")]
    EnhanceText,
    #[value(name = "analyze-enhanced")]
    AnalyzeEnhanced,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Parse,
        Stage::AnalyzeBias,
        Stage::EnhanceText,
        Stage::AnalyzeEnhanced,
    ];

    /// Identifier used on the command line and in result headings.
    pub fn as_id(self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::AnalyzeBias => "analyze",
            Stage::EnhanceText => "enhance",
            Stage::AnalyzeEnhanced => "analyze-enhanced",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::Parse => "Parse Text",
            Stage::AnalyzeBias => "Analyze Bias",
            Stage::EnhanceText => "Enhanced Text",
            Stage::AnalyzeEnhanced => "Analyze Enhanced",
        }
    }

    /// Whether the stage needs a page URL to run.
    pub fn requires_uri(self) -> bool {
        !matches!(self, Stage::AnalyzeEnhanced)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_id())
    }
}

/// User-edited input; snapshotted at the start of each stage run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInput {
    pub uri: String,
    /// Forwarded to the service as `use_selenium`; never interpreted here.
    pub use_external_fetch: bool,
}

impl PipelineInput {
    pub fn new(uri: impl Into<String>, use_external_fetch: bool) -> Self {
        Self {
            uri: uri.into(),
            use_external_fetch,
        }
    }

    pub fn trimmed_uri(&self) -> &str {
        self.uri.trim()
    }
}

/// Feedback for one bias category (stereotyping, representation, language, framing).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryAssessment {
    pub feedback: Option<String>,
    pub score: Option<f64>,
    pub example: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentAssessment {
    pub label: Option<String>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadabilityAssessment {
    pub score: Option<f64>,
    pub level: Option<String>,
    pub comment: Option<String>,
}

/// Bias report produced by the remote service.
///
/// The service speaks a flat shape (`stereotyping_feedback`, `sentiment_label`, ...);
/// serde maps it onto the grouped fields below. Every field is optional so a partial
/// report still decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireAnalysis", into = "WireAnalysis")]
pub struct StructuredAnalysis {
    pub summary: Option<String>,
    pub overall_score: Option<f64>,
    pub stereotyping: CategoryAssessment,
    pub representation: CategoryAssessment,
    pub language: CategoryAssessment,
    pub framing: CategoryAssessment,
    pub sentiment: SentimentAssessment,
    pub readability: ReadabilityAssessment,
    pub positive_aspects: Option<String>,
    pub improvement_suggestions: Option<String>,
    pub male_to_female_mention_ratio: Option<f64>,
    pub gender_neutral_language_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    overall_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stereotyping_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stereotyping_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stereotyping_example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    representation_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    representation_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    representation_example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language_example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    framing_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    framing_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    framing_example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sentiment_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sentiment_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    readability_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    readability_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    readability_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    positive_aspects: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    improvement_suggestions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    male_to_female_mention_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gender_neutral_language_percentage: Option<f64>,
}

impl From<WireAnalysis> for StructuredAnalysis {
    fn from(w: WireAnalysis) -> Self {
        Self {
            summary: w.summary,
            overall_score: w.overall_score,
            stereotyping: CategoryAssessment {
                feedback: w.stereotyping_feedback,
                score: w.stereotyping_score,
                example: w.stereotyping_example,
            },
            representation: CategoryAssessment {
                feedback: w.representation_feedback,
                score: w.representation_score,
                example: w.representation_example,
            },
            language: CategoryAssessment {
                feedback: w.language_feedback,
                score: w.language_score,
                example: w.language_example,
            },
            framing: CategoryAssessment {
                feedback: w.framing_feedback,
                score: w.framing_score,
                example: w.framing_example,
            },
            sentiment: SentimentAssessment {
                label: w.sentiment_label,
                score: w.sentiment_score,
            },
            readability: ReadabilityAssessment {
                score: w.readability_score,
                level: w.readability_level,
                comment: w.readability_comment,
            },
            positive_aspects: w.positive_aspects,
            improvement_suggestions: w.improvement_suggestions,
            male_to_female_mention_ratio: w.male_to_female_mention_ratio,
            gender_neutral_language_percentage: w.gender_neutral_language_percentage,
        }
    }
}

impl From<StructuredAnalysis> for WireAnalysis {
    fn from(a: StructuredAnalysis) -> Self {
        Self {
            summary: a.summary,
            overall_score: a.overall_score,
            stereotyping_feedback: a.stereotyping.feedback,
            stereotyping_score: a.stereotyping.score,
            stereotyping_example: a.stereotyping.example,
            representation_feedback: a.representation.feedback,
            representation_score: a.representation.score,
            representation_example: a.representation.example,
            language_feedback: a.language.feedback,
            language_score: a.language.score,
            language_example: a.language.example,
            framing_feedback: a.framing.feedback,
            framing_score: a.framing.score,
            framing_example: a.framing.example,
            sentiment_label: a.sentiment.label,
            sentiment_score: a.sentiment.score,
            readability_score: a.readability.score,
            readability_level: a.readability.level,
            readability_comment: a.readability.comment,
            positive_aspects: a.positive_aspects,
            improvement_suggestions: a.improvement_suggestions,
            male_to_female_mention_ratio: a.male_to_female_mention_ratio,
            gender_neutral_language_percentage: a.gender_neutral_language_percentage,
        }
    }
}

/// Response of the bias-analysis endpoint.
///
/// `body` is the document exactly as received; the enhancement call forwards it
/// unchanged, so fields this crate does not model survive the round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub body: serde_json::Value,
    pub analysis: StructuredAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResultValue {
    Text(String),
    // Boxed to keep the enum small next to the text variant.
    Structured(Box<StructuredAnalysis>),
}

impl ResultValue {
    pub fn is_text(&self) -> bool {
        matches!(self, ResultValue::Text(_))
    }
}

/// Events emitted by the run controller and consumed by presentation layers.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StageStarted {
        stage: Stage,
    },
    StageCompleted {
        stage: Stage,
        result: Box<ResultValue>,
        completed_at: String,
    },
    StageFailed {
        stage: Stage,
        message: String,
    },
    /// A stage request arrived while another stage was in flight.
    Rejected {
        stage: Stage,
        message: String,
    },
    Info(String),
}
