use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a finished build as reported by Jenkins.
///
/// Values Jenkins may add in the future land in [`BuildResult::Other`] instead
/// of failing the whole payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildResult {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
    Other(String),
}

impl BuildResult {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Unstable => "UNSTABLE",
            Self::Aborted => "ABORTED",
            Self::NotBuilt => "NOT_BUILT",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Lowercased result, used as the CSS class of a cell.
    pub fn css_class(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl From<String> for BuildResult {
    fn from(value: String) -> Self {
        match value.as_str() {
            "SUCCESS" => Self::Success,
            "FAILURE" => Self::Failure,
            "UNSTABLE" => Self::Unstable,
            "ABORTED" => Self::Aborted,
            "NOT_BUILT" => Self::NotBuilt,
            _ => Self::Other(value),
        }
    }
}

impl From<BuildResult> for String {
    fn from(value: BuildResult) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trailing token of a job name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildKind {
    Build,
    Test,
}

impl BuildKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "build" => Some(Self::Build),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub number: Option<u64>,
    pub result: Option<BuildResult>,
    /// Epoch milliseconds.
    pub timestamp: Option<i64>,
    pub url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub name: String,
    pub last_completed_build: Option<Build>,
    pub last_successful_build: Option<Build>,
    pub last_failed_build: Option<Build>,
    pub last_stable_build: Option<Build>,
}

impl Job {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_completed_build: None,
            last_successful_build: None,
            last_failed_build: None,
            last_stable_build: None,
        }
    }
}
