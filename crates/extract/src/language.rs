use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use ingest::Document;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::TextAnalyzer;
use crate::schema::{AnalysisOutcome, DocumentResult};
use crate::wire::{
    AnalysisInput, InputDocument, JobRequest, JobState, JobStatus, TaskRequest, TaskResults,
};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub language: String,
    pub poll_interval_ms: u64,
    pub max_polls: usize,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000".to_string(),
            api_key: String::new(),
            api_version: "2023-04-01".to_string(),
            language: "en".to_string(),
            poll_interval_ms: 5000,
            max_polls: 120,
        }
    }
}

/// Client for the healthcare entity analysis job of the language service
#[derive(Clone)]
pub struct LanguageClient {
    config: LanguageConfig,
    client: reqwest::Client,
}

impl LanguageClient {
    pub fn new(config: LanguageConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn jobs_url(&self) -> String {
        format!(
            "{}/language/analyze-text/jobs?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.api_version
        )
    }

    /// Submit the job and return the operation URL to poll
    pub async fn submit_job(&self, documents: &[Document]) -> Result<String> {
        let request = JobRequest {
            display_name: "entity-relation-ingest",
            analysis_input: AnalysisInput {
                documents: documents
                    .iter()
                    .map(|d| InputDocument {
                        id: &d.doc_id,
                        language: &self.config.language,
                        text: &d.text,
                    })
                    .collect(),
            },
            tasks: vec![TaskRequest::healthcare()],
        };

        let response = self
            .client
            .post(self.jobs_url())
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send analysis job to language service")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Language service rejected analysis job: {} {}", status, body);
        }

        let location = response
            .headers()
            .get("operation-location")
            .map(HeaderValue::to_str)
            .transpose()
            .context("operation-location header is not valid text")?
            .context("Language service response had no operation-location header")?
            .to_string();

        debug!(operation = %location, "Analysis job accepted");
        Ok(location)
    }

    /// Poll the job until it reaches a terminal state
    pub(crate) async fn wait_for_job(&self, operation: &str) -> Result<JobState> {
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        for attempt in 1..=self.config.max_polls {
            tokio::time::sleep(interval).await;

            let response = self
                .client
                .get(operation)
                .header(SUBSCRIPTION_KEY_HEADER, &self.config.api_key)
                .send()
                .await
                .context("Failed to poll analysis job")?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                bail!("Polling analysis job failed: {} {}", status, body);
            }

            let state: JobState = response
                .json()
                .await
                .context("Failed to parse analysis job state")?;

            debug!(attempt, status = ?state.status, "Polled analysis job");
            if state.status.is_terminal() {
                return Ok(state);
            }
        }

        bail!(
            "Analysis job did not finish after {} polls",
            self.config.max_polls
        )
    }
}

#[async_trait]
impl TextAnalyzer for LanguageClient {
    async fn analyze(&self, documents: &[Document]) -> Result<Vec<DocumentResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        info!(documents = documents.len(), "Submitting healthcare analysis job");
        let operation = self.submit_job(documents).await?;
        let state = self.wait_for_job(&operation).await?;

        if matches!(state.status, JobStatus::Failed | JobStatus::Cancelled) {
            let reasons: Vec<String> = state
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect();
            bail!(
                "Analysis job ended as {:?}: {}",
                state.status,
                reasons.join("; ")
            );
        }

        let results = state.into_healthcare_results().unwrap_or_default();
        collate(documents, results)
    }
}

/// Line results up with the input documents, preserving input order
fn collate(documents: &[Document], results: TaskResults) -> Result<Vec<DocumentResult>> {
    if let Some(model) = &results.model_version {
        debug!(model = %model, "Healthcare model version");
    }

    let mut analyzed: HashMap<String, _> = results
        .documents
        .into_iter()
        .map(|d| (d.id.clone(), d))
        .collect();
    let mut errored: HashMap<String, _> = results
        .errors
        .into_iter()
        .map(|e| (e.id, e.error))
        .collect();

    let mut collated = Vec::with_capacity(documents.len());
    for document in documents {
        let outcome = if let Some(wire) = analyzed.remove(&document.doc_id) {
            AnalysisOutcome::Analyzed(wire.into_extraction()?)
        } else if let Some(error) = errored.remove(&document.doc_id) {
            warn!(
                doc_id = %document.doc_id,
                code = %error.code,
                message = %error.message,
                "Language service could not analyze document"
            );
            AnalysisOutcome::Errored {
                code: error.code,
                message: error.message,
            }
        } else {
            warn!(doc_id = %document.doc_id, "No analysis result returned for document");
            AnalysisOutcome::Errored {
                code: "MissingResult".to_string(),
                message: "language service returned no result for this document".to_string(),
            }
        };

        collated.push(DocumentResult {
            doc_id: document.doc_id.clone(),
            outcome,
        });
    }

    Ok(collated)
}
