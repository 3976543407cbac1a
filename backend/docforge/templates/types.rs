//! Type definitions for dataset templates.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Field types a dataset template may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Categorical,
    Array,
}

/// One declared field of a dataset template
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemplateField {
    /// Field name, unique case-insensitively within the template
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed values; required when `field_type` is categorical
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Whether the field may be absent from rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// Annotation task description attached to a template
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnnotationSchema {
    /// Kind of annotation task
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Candidate labels, when the task is a choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Annotator instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// A declarative description of a dataset's shape
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatasetTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<TemplateField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_schema: Option<AnnotationSchema>,
}

/// Outcome of a template validation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationReport {
    /// True iff `errors` is empty
    pub valid: bool,
    /// Ordered, human-readable error descriptions
    pub errors: Vec<String>,
    /// Ordered, non-fatal findings
    pub warnings: Vec<String>,
    /// The template's id when one was present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}
