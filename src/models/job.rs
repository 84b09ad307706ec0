use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Job metadata as exposed by `GET /api/jobs/{job_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetails {
    /// Job identifier
    pub id: Uuid,

    /// Display title
    pub title: String,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// Parameter name to default value, used to pre-populate a
    /// manual-run form
    #[serde(default)]
    pub default_args: HashMap<String, serde_json::Value>,
}
