//! Request and response shapes of the `analyze-text/jobs` REST API.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::schema::{Entity, EntityRef, ExtractionResult, Relation, Role};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobRequest<'a> {
    pub display_name: &'a str,
    pub analysis_input: AnalysisInput<'a>,
    pub tasks: Vec<TaskRequest>,
}

#[derive(Serialize)]
pub(crate) struct AnalysisInput<'a> {
    pub documents: Vec<InputDocument<'a>>,
}

#[derive(Serialize)]
pub(crate) struct InputDocument<'a> {
    pub id: &'a str,
    pub language: &'a str,
    pub text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskRequest {
    pub kind: &'static str,
    pub task_name: &'static str,
    pub parameters: TaskParameters,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskParameters {
    pub model_version: &'static str,
}

impl TaskRequest {
    pub fn healthcare() -> Self {
        Self {
            kind: "Healthcare",
            task_name: "healthcare-entities",
            parameters: TaskParameters {
                model_version: "latest",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum JobStatus {
    NotStarted,
    Running,
    Succeeded,
    PartiallyCompleted,
    Failed,
    Cancelling,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::PartiallyCompleted | Self::Failed | Self::Cancelled
        )
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobState {
    pub status: JobStatus,
    #[serde(default)]
    pub errors: Vec<ServiceError>,
    pub tasks: Option<TaskSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskSummary {
    #[serde(default)]
    pub items: Vec<TaskItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskItem {
    pub kind: String,
    pub results: Option<TaskResults>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskResults {
    #[serde(default)]
    pub documents: Vec<WireDocument>,
    #[serde(default)]
    pub errors: Vec<DocumentError>,
    pub model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireDocument {
    pub id: String,
    #[serde(default)]
    pub entities: Vec<WireEntity>,
    #[serde(default)]
    pub relations: Vec<WireRelation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireEntity {
    pub text: String,
    pub category: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireRelation {
    pub relation_type: String,
    #[serde(default)]
    pub entities: Vec<WireRole>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRole {
    #[serde(rename = "ref")]
    pub reference: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentError {
    pub id: String,
    pub error: ServiceError,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ServiceError {
    pub code: String,
    pub message: String,
}

impl JobState {
    /// Results of the healthcare task, if the job produced any
    pub fn into_healthcare_results(self) -> Option<TaskResults> {
        self.tasks?
            .items
            .into_iter()
            .find(|item| item.kind.starts_with("Healthcare"))
            .and_then(|item| item.results)
    }
}

/// Entity index from a JSON pointer like `#/results/documents/0/entities/3`
pub(crate) fn parse_entity_ref(reference: &str) -> Option<usize> {
    let mut segments = reference.rsplit('/');
    let index = segments.next()?.parse().ok()?;
    match segments.next() {
        Some("entities") => Some(index),
        _ => None,
    }
}

impl WireDocument {
    pub fn into_extraction(self) -> Result<ExtractionResult> {
        let entities: Vec<Entity> = self
            .entities
            .into_iter()
            .map(|e| Entity {
                category: e.category,
                text: e.text,
                normalized_text: e.name,
            })
            .collect();

        let mut relations = Vec::with_capacity(self.relations.len());
        for relation in self.relations {
            let mut roles = Vec::with_capacity(relation.entities.len());
            for role in relation.entities {
                let Some(index) = parse_entity_ref(&role.reference) else {
                    bail!(
                        "Document {}: malformed entity reference {:?}",
                        self.id,
                        role.reference
                    );
                };
                let Some(entity) = entities.get(index) else {
                    bail!(
                        "Document {}: reference {:?} points past {} entities",
                        self.id,
                        role.reference,
                        entities.len()
                    );
                };
                roles.push(Role {
                    name: role.role,
                    entity: EntityRef::to_entity(entity, index),
                });
            }
            relations.push(Relation {
                relation_type: relation.relation_type,
                roles,
            });
        }

        Ok(ExtractionResult {
            entities,
            relations,
        })
    }
}
