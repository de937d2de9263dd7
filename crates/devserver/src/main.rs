use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderName, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::{Parser, Subcommand};
use reqwest::{redirect, Client};
use shared::error::{ApiError, ErrorCode};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::{FixtureState, ProxyState};
use config::{load_settings, normalize_upstream, Settings};

/// Request headers passed through to the upstream CI server.
const FORWARDED_HEADERS: [HeaderName; 3] =
    [header::ACCEPT, header::CONTENT_TYPE, header::AUTHORIZATION];

#[derive(Parser, Debug)]
#[command(name = "devserver", about = "Local servers for developing the CI dashboard")]
struct Cli {
    #[arg(long, global = true, default_value = "devserver.toml")]
    config: PathBuf,
    /// Overrides the listen address of the chosen server.
    #[arg(long, global = true)]
    bind: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forward every request to the CI server with permissive CORS headers.
    Proxy {
        #[arg(long)]
        upstream: Option<String>,
    },
    /// Answer every request with a canned jobs payload.
    Fixture {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Serve a directory of static files.
    Static {
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long)]
        index: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli.config);
    let (bind, app) = build_app(cli.command, cli.bind, settings)?;

    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid listen address '{bind}'"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "devserver listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_app(
    command: Command,
    bind: Option<String>,
    settings: Settings,
) -> anyhow::Result<(String, Router)> {
    match command {
        Command::Proxy { upstream } => {
            let upstream =
                normalize_upstream(upstream.as_deref().unwrap_or(&settings.upstream_url))?;
            info!(%upstream, "proxying to upstream");
            let http = Client::builder()
                .redirect(redirect::Policy::none())
                .build()
                .context("failed to build upstream http client")?;
            let state = Arc::new(ProxyState { http, upstream });
            Ok((bind.unwrap_or(settings.api_bind), build_proxy_router(state)))
        }
        Command::Fixture { file } => {
            let path = file.unwrap_or(settings.fixture_path);
            info!(path = %path.display(), "serving fixture");
            let state = Arc::new(FixtureState { path });
            Ok((bind.unwrap_or(settings.api_bind), build_fixture_router(state)))
        }
        Command::Static { dir, index } => {
            let dir = dir.unwrap_or(settings.static_dir);
            let index = index.unwrap_or(settings.index_file);
            info!(dir = %dir.display(), %index, "serving static files");
            Ok((
                bind.unwrap_or(settings.static_bind),
                build_static_router(&dir, &index),
            ))
        }
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
}

fn build_proxy_router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .fallback(forward)
        .with_state(state)
        .layer(cors_layer())
}

fn build_fixture_router(state: Arc<FixtureState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .fallback(serve_fixture)
        .with_state(state)
        .layer(cors_layer())
}

fn build_static_router(dir: &Path, index: &str) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route_service("/", ServeFile::new(dir.join(index)))
        .fallback_service(ServeDir::new(dir))
        .layer(cors_layer())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn forward(
    State(state): State<Arc<ProxyState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let url = format!("{}{path}", state.upstream);

    let mut request = state.http.request(method.clone(), &url).body(body);
    for name in FORWARDED_HEADERS {
        if let Some(value) = headers.get(&name) {
            request = request.header(name, value.clone());
        }
    }

    let upstream = request.send().await.map_err(|error| {
        warn!(%url, %error, "upstream request failed");
        bad_gateway(format!("upstream request to {url} failed: {error}"))
    })?;
    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let location = upstream.headers().get(header::LOCATION).cloned();
    let bytes = upstream.bytes().await.map_err(|error| {
        warn!(%url, %error, "failed reading upstream body");
        bad_gateway(format!("failed reading upstream body from {url}: {error}"))
    })?;
    info!(%method, %url, status = status.as_u16(), "proxied");

    let mut response = (status, bytes).into_response();
    if let Some(value) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    if let Some(value) = location {
        response.headers_mut().insert(header::LOCATION, value);
    }
    Ok(response)
}

async fn serve_fixture(
    State(state): State<Arc<FixtureState>>,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    let body = tokio::fs::read(&state.path).await.map_err(|error| {
        warn!(path = %state.path.display(), %error, "fixture unavailable");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(
                ErrorCode::Internal,
                format!("cannot read fixture {}: {error}", state.path.display()),
            )),
        )
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

fn bad_gateway(message: String) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_GATEWAY,
        Json(ApiError::new(ErrorCode::BadGateway, message)),
    )
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
