use std::path::PathBuf;

use reqwest::Client;

#[derive(Clone)]
pub(crate) struct ProxyState {
    pub(crate) http: Client,
    /// Base URL requests are forwarded to, without a trailing slash.
    pub(crate) upstream: String,
}

#[derive(Clone)]
pub(crate) struct FixtureState {
    pub(crate) path: PathBuf,
}
