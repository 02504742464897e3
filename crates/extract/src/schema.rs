use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub category: String,
    pub text: String,
    pub normalized_text: Option<String>,
}

impl Entity {
    pub fn new(category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            text: text.into(),
            normalized_text: None,
        }
    }

    pub fn with_normalized(mut self, normalized: impl Into<String>) -> Self {
        self.normalized_text = Some(normalized.into());
        self
    }
}

/// Points a role back at an entity by category and text.
///
/// `index` is the entity's position in its document's entity list when the
/// service provided one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub category: String,
    pub text: String,
    pub index: Option<usize>,
}

impl EntityRef {
    pub fn to_entity(entity: &Entity, index: usize) -> Self {
        Self {
            category: entity.category.clone(),
            text: entity.text.clone(),
            index: Some(index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub entity: EntityRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub relation_type: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalysisOutcome {
    Analyzed(ExtractionResult),
    Errored { code: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub doc_id: String,
    pub outcome: AnalysisOutcome,
}

impl DocumentResult {
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, AnalysisOutcome::Errored { .. })
    }

    pub fn extraction(&self) -> Option<&ExtractionResult> {
        match &self.outcome {
            AnalysisOutcome::Analyzed(extraction) => Some(extraction),
            AnalysisOutcome::Errored { .. } => None,
        }
    }
}
