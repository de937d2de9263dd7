use super::*;
use axum::{
    body::{self, Body},
    http::Request,
};
use tokio::net::TcpListener;
use tower::ServiceExt;

async fn body_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap) -> impl IntoResponse {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();
    (
        StatusCode::ACCEPTED,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::json!({ "method": method.as_str(), "uri": uri.to_string(), "auth": auth })
            .to_string(),
    )
}

async fn spawn_upstream() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().fallback(echo);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn proxy_app(upstream: String) -> Router {
    build_proxy_router(Arc::new(ProxyState {
        http: Client::new(),
        upstream,
    }))
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = build_fixture_router(Arc::new(FixtureState {
        path: PathBuf::from("unused.json"),
    }));
    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn fixture_is_served_for_any_path_with_cors() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("example.json");
    std::fs::write(&path, r#"{"jobs":[]}"#).expect("fixture");
    let app = build_fixture_router(Arc::new(FixtureState { path }));

    let request = Request::get("/view/FreeBSD/api/json?depth=1")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    assert_eq!(body_text(response).await, r#"{"jobs":[]}"#);
}

#[tokio::test]
async fn missing_fixture_is_an_internal_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = build_fixture_router(Arc::new(FixtureState {
        path: dir.path().join("absent.json"),
    }));

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error: ApiError = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(error.code, ErrorCode::Internal);
    assert!(error.message.contains("absent.json"));
}

#[tokio::test]
async fn preflight_allows_dashboard_headers() {
    let app = build_fixture_router(Arc::new(FixtureState {
        path: PathBuf::from("unused.json"),
    }));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/view/FreeBSD/api/json")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-requested-with")
        .body(Body::empty())
        .expect("request");

    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let allowed = response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .expect("header")
        .to_ascii_lowercase();
    assert!(allowed.contains("x-requested-with"));
    assert!(allowed.contains("authorization"));
}

#[tokio::test]
async fn proxy_forwards_path_query_and_auth() {
    let upstream = spawn_upstream().await;
    let app = proxy_app(upstream);

    let request = Request::get("/job/FreeBSD-head-amd64-build/7/api/json?tree=description")
        .header(header::AUTHORIZATION, "Basic Y2k6c2VjcmV0")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let echoed: serde_json::Value =
        serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(echoed["method"], "GET");
    assert_eq!(
        echoed["uri"],
        "/job/FreeBSD-head-amd64-build/7/api/json?tree=description"
    );
    assert_eq!(echoed["auth"], "Basic Y2k6c2VjcmV0");
}

#[tokio::test]
async fn proxy_reports_unreachable_upstream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let app = proxy_app(format!("http://{addr}"));

    let response = app
        .oneshot(Request::get("/api/json").body(Body::empty()).expect("request"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let error: ApiError = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(error.code, ErrorCode::BadGateway);
}

#[tokio::test]
async fn static_server_uses_configured_index() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("test.html"), "<p>dashboard</p>").expect("index");
    std::fs::write(dir.path().join("style.css"), "body {}").expect("css");
    let app = build_static_router(dir.path(), "test.html");

    let index = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(index.status(), StatusCode::OK);
    assert_eq!(body_text(index).await, "<p>dashboard</p>");

    let css = app
        .oneshot(Request::get("/style.css").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(css.status(), StatusCode::OK);
    assert_eq!(body_text(css).await, "body {}");
}

#[test]
fn build_app_prefers_cli_over_settings() {
    let settings = Settings {
        upstream_url: "https://ci.example.org/".into(),
        ..Settings::default()
    };
    let (bind, _) = build_app(
        Command::Proxy { upstream: None },
        Some("127.0.0.1:9000".into()),
        settings.clone(),
    )
    .expect("proxy app");
    assert_eq!(bind, "127.0.0.1:9000");

    let (bind, _) = build_app(
        Command::Static {
            dir: None,
            index: None,
        },
        None,
        settings.clone(),
    )
    .expect("static app");
    assert_eq!(bind, "127.0.0.1:3000");

    let err = build_app(
        Command::Proxy {
            upstream: Some("not a url".into()),
        },
        None,
        settings,
    )
    .expect_err("bad upstream");
    assert!(err.to_string().contains("not a url"));
}

#[test]
fn global_flags_follow_the_subcommand() {
    let cli = Cli::try_parse_from([
        "devserver",
        "fixture",
        "--config",
        "dev.toml",
        "--bind",
        "127.0.0.1:9100",
    ])
    .expect("parse");
    assert_eq!(cli.config, PathBuf::from("dev.toml"));
    assert_eq!(cli.bind.as_deref(), Some("127.0.0.1:9100"));
    assert!(matches!(cli.command, Command::Fixture { file: None }));

    let cli =
        Cli::try_parse_from(["devserver", "--bind", "0.0.0.0:8000", "proxy"]).expect("parse");
    assert_eq!(cli.bind.as_deref(), Some("0.0.0.0:8000"));
    assert_eq!(cli.config, PathBuf::from("devserver.toml"));
}
