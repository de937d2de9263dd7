use std::{fmt, str::FromStr};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::Job,
    protocol::{BuildDescription, JobsResponse},
};
use tracing::debug;
use url::Url;

mod dashboard;
pub mod error;

pub use dashboard::{build_dashboard, Dashboard, DashboardOptions};
pub use error::ClientError;

/// Jobs of the FreeBSD view with every build field the dashboard reads.
pub const DEFAULT_JOBS_PATH: &str = "/view/FreeBSD/api/json?tree=jobs[name,lastCompletedBuild[number,result,timestamp,url,description],lastSuccessfulBuild[number,result,timestamp,url,description],lastFailedBuild[number],lastStableBuild[number]]";

/// Where the dashboard is being served from; picks the default CI endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    /// Through the local proxy or fixture server.
    Local,
    /// Static snapshot hosted on a people.freebsd.org page.
    Stage,
    #[default]
    Prod,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Stage => "stage",
            Self::Prod => "prod",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Local => "http://localhost:8000",
            Self::Stage => "https://people.freebsd.org/~ygy/tinderbox",
            Self::Prod => "https://ci.freebsd.org",
        }
    }

    pub fn default_jobs_path(self) -> &'static str {
        match self {
            Self::Stage => "/example.json",
            Self::Local | Self::Prod => DEFAULT_JOBS_PATH,
        }
    }

    /// Pages built outside production carry a preview banner.
    pub fn is_preview(self) -> bool {
        !matches!(self, Self::Prod)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "stage" => Ok(Self::Stage),
            "prod" | "production" => Ok(Self::Prod),
            other => Err(format!(
                "unknown environment '{other}', expected local, stage or prod"
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read access to a Jenkins-style CI server.
#[async_trait]
pub trait CiApi: Send + Sync {
    async fn fetch_jobs(&self) -> Result<Vec<Job>, ClientError>;

    /// Description (usually the source revision) of one build.
    async fn fetch_build_description(
        &self,
        job_name: &str,
        build_number: u64,
    ) -> Result<Option<String>, ClientError>;

    /// Human-facing page of one build.
    fn build_url(&self, job_name: &str, build_number: u64) -> String;
}

#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    password: String,
}

pub struct JenkinsClient {
    http: Client,
    base_url: String,
    parsed_base: Url,
    jobs_path: String,
    credentials: Option<Credentials>,
}

impl JenkinsClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url).map_err(|err| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            parsed_base: parsed,
            jobs_path: DEFAULT_JOBS_PATH.to_string(),
            credentials: None,
        })
    }

    pub fn with_jobs_path(mut self, jobs_path: impl Into<String>) -> Self {
        self.jobs_path = jobs_path.into();
        self
    }

    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// `{base}/job/{name}/{number}/` followed by `rest`, with the job name
    /// percent-encoded as a single path segment.
    fn job_url(&self, job_name: &str, build_number: u64, rest: &[&str]) -> Url {
        let mut url = self.parsed_base.clone();
        let number = build_number.to_string();
        // http(s) urls always have a path.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["job", job_name, number.as_str()])
                .extend(rest);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ClientError> {
        debug!(%url, "GET");
        let mut request = self.http.get(&url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UpstreamStatus {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|source| ClientError::Decode { url, source })
    }
}

#[async_trait]
impl CiApi for JenkinsClient {
    async fn fetch_jobs(&self) -> Result<Vec<Job>, ClientError> {
        let response: JobsResponse = self.get_json(self.endpoint(&self.jobs_path)).await?;
        Ok(response.jobs)
    }

    async fn fetch_build_description(
        &self,
        job_name: &str,
        build_number: u64,
    ) -> Result<Option<String>, ClientError> {
        let mut url = self.job_url(job_name, build_number, &["api", "json"]);
        url.set_query(Some("tree=description"));
        let response: BuildDescription = self.get_json(url.into()).await?;
        Ok(response.description)
    }

    fn build_url(&self, job_name: &str, build_number: u64) -> String {
        self.job_url(job_name, build_number, &[""]).into()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
