//! Remote analysis service client.
//!
//! Four JSON POST endpoints back the pipeline stages. The trait is the seam the
//! executor is written against; `HttpBiasService` is the production implementation.

use crate::model::{AnalysisResponse, PipelineInput, ServiceConfig, StructuredAnalysis};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;

const EXTRACT_PATH: &str = "/ParsedText";
const ANALYZE_PATH: &str = "/analyze";
const ENHANCE_PATH: &str = "/EnhancedText";
const ANALYZE_ENHANCED_PATH: &str = "/analyzeEnhancedUsingModel2";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("response from {endpoint} has no `{field}` field")]
    MissingField {
        endpoint: &'static str,
        field: &'static str,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// The remote capabilities each stage calls into.
#[async_trait]
pub trait BiasService: Send + Sync {
    /// Extract the visible text of the page at `input.uri`.
    async fn extract(&self, input: &PipelineInput) -> Result<String, ServiceError>;

    /// Score the page at `input.uri` for bias.
    async fn analyze(&self, input: &PipelineInput) -> Result<AnalysisResponse, ServiceError>;

    /// Rewrite the page using a prior analysis response.
    async fn enhance(&self, analysis: &AnalysisResponse) -> Result<String, ServiceError>;

    /// Score free text with the second model.
    async fn analyze_text(&self, text: &str) -> Result<StructuredAnalysis, ServiceError>;
}

#[derive(Serialize)]
struct PageRequest<'a> {
    uri: &'a str,
    use_selenium: bool,
}

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

pub struct HttpBiasService {
    http: Client,
    base_url: String,
}

impl HttpBiasService {
    pub fn new(cfg: &ServiceConfig) -> Result<Self, ServiceError> {
        let mut builder = Client::builder().user_agent(cfg.user_agent.clone());
        if let Some(timeout) = cfg.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ServiceError::Client)?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and return the response text of a 2xx reply.
    async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &'static str,
        body: &B,
    ) -> Result<String, ServiceError> {
        tracing::debug!(endpoint, "posting request");
        let resp = self
            .http
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|source| ServiceError::Transport { endpoint, source })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|source| ServiceError::Transport { endpoint, source })?;

        if !status.is_success() {
            tracing::warn!(endpoint, %status, "service returned an error status");
            return Err(ServiceError::Status {
                endpoint,
                status,
                body: text,
            });
        }
        tracing::debug!(endpoint, %status, bytes = text.len(), "response received");
        Ok(text)
    }
}

/// Text endpoints may answer with a JSON string literal or a bare body.
fn decode_text(body: String) -> String {
    match serde_json::from_str::<String>(&body) {
        Ok(s) => s,
        Err(_) => body,
    }
}

fn decode_json(endpoint: &'static str, body: &str) -> Result<serde_json::Value, ServiceError> {
    serde_json::from_str(body).map_err(|source| ServiceError::Decode { endpoint, source })
}

fn decode_analysis(
    endpoint: &'static str,
    value: serde_json::Value,
) -> Result<StructuredAnalysis, ServiceError> {
    serde_json::from_value(value).map_err(|source| ServiceError::Decode { endpoint, source })
}

#[async_trait]
impl BiasService for HttpBiasService {
    async fn extract(&self, input: &PipelineInput) -> Result<String, ServiceError> {
        let body = self
            .post(
                EXTRACT_PATH,
                &PageRequest {
                    uri: input.trimmed_uri(),
                    use_selenium: input.use_external_fetch,
                },
            )
            .await?;
        Ok(decode_text(body))
    }

    async fn analyze(&self, input: &PipelineInput) -> Result<AnalysisResponse, ServiceError> {
        let text = self
            .post(
                ANALYZE_PATH,
                &PageRequest {
                    uri: input.trimmed_uri(),
                    use_selenium: input.use_external_fetch,
                },
            )
            .await?;
        let body = decode_json(ANALYZE_PATH, &text)?;
        let result = body
            .get("result")
            .cloned()
            .ok_or(ServiceError::MissingField {
                endpoint: ANALYZE_PATH,
                field: "result",
            })?;
        let analysis = decode_analysis(ANALYZE_PATH, result)?;
        Ok(AnalysisResponse { body, analysis })
    }

    async fn enhance(&self, analysis: &AnalysisResponse) -> Result<String, ServiceError> {
        let body = self.post(ENHANCE_PATH, &analysis.body).await?;
        Ok(decode_text(body))
    }

    async fn analyze_text(&self, text: &str) -> Result<StructuredAnalysis, ServiceError> {
        let body = self
            .post(ANALYZE_ENHANCED_PATH, &TextRequest { text })
            .await?;
        let value = decode_json(ANALYZE_ENHANCED_PATH, &body)?;
        decode_analysis(ANALYZE_ENHANCED_PATH, value)
    }
}
