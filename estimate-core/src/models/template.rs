use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proposal markup with `{{placeholder}}` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub body: String,
}

/// A proposal generated from a template and kept on the estimate.
///
/// Once `custom_edited` is set the document is no longer regenerated
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProposal {
    pub template_id: String,
    pub html: String,
    #[serde(default)]
    pub custom_edited: bool,
    pub generated_at: DateTime<Utc>,
}
