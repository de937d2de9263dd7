use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid CI base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    UpstreamStatus { url: String, status: u16 },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ClientError {
    /// HTTP status of an upstream rejection, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
