use serde::{Deserialize, Serialize};

use crate::domain::Job;

/// Body of `GET /view/<view>/api/json?tree=jobs[...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsResponse {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// Body of `GET /job/<name>/<number>/api/json?tree=description`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDescription {
    pub description: Option<String>,
}
