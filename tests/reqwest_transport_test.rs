use bundle_updater::engine::config::UpdaterConfig;
use bundle_updater::engine::updater::{
    BodyFormat, InstallLayout, Payload, Phase, ReqwestTransport, RequestOptions, Transport,
    TransportError, Updater,
};
use serde_json::{json, Map, Value};
use std::fs;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn current(version: &str) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("current".to_string(), json!(version));
    body
}

#[tokio::test]
async fn test_post_form_and_decode_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/check"))
        .and(header("x-app-channel", "beta"))
        .and(body_string_contains("current=1.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"latestVersion": "1.0.0"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut options = RequestOptions::default();
    options
        .headers
        .insert("x-app-channel".to_string(), "beta".to_string());
    let transport = ReqwestTransport::new(&options).unwrap();

    let payload = transport
        .post(&format!("{}/check", server.uri()), &current("1.0.0"))
        .await
        .unwrap();

    assert_eq!(payload, Payload::Json(json!({"latestVersion": "1.0.0"})));
}

#[tokio::test]
async fn test_post_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/check"))
        .and(body_json(json!({"current": "1.0.0"})))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"last":"1.0.0"}"#))
        .mount(&server)
        .await;

    let options = RequestOptions {
        body_format: BodyFormat::Json,
        ..RequestOptions::default()
    };
    let transport = ReqwestTransport::new(&options).unwrap();

    let payload = transport
        .post(&format!("{}/check", server.uri()), &current("1.0.0"))
        .await
        .unwrap();

    // Served as text/plain, so it stays text for the manifest parser
    assert_eq!(payload, Payload::Text(r#"{"last":"1.0.0"}"#.to_string()));
}

#[tokio::test]
async fn test_error_status_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/update.pkg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&RequestOptions::default()).unwrap();
    let err = transport
        .get(&format!("{}/update.pkg", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_get_returns_raw_bytes() {
    let server = MockServer::start().await;
    let artifact: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();
    Mock::given(method("GET"))
        .and(path("/update.pkg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(artifact.clone()))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&RequestOptions::default()).unwrap();
    let body = transport
        .get(&format!("{}/update.pkg", server.uri()))
        .await
        .unwrap();

    assert_eq!(body, artifact);
}

#[tokio::test]
async fn test_update_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latestVersion": "1.2.0",
            "sourceURL": format!("{}/update.pkg", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/update.pkg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x00new bundle\xff".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let install = dir.path().join("app.asar");
    fs::write(&install, b"old bundle").unwrap();
    fs::write(dir.path().join("package.json"), r#"{"version": "1.0.0"}"#).unwrap();

    let config = UpdaterConfig::new(format!("{}/check", server.uri()), InstallLayout::new(&install));
    let updater = Updater::from_config(&config).unwrap();

    let mut session = updater.start_session();
    updater.check(&mut session).await.unwrap();
    updater.download(&mut session).await.unwrap();

    assert_eq!(session.phase(), Phase::Done);
    assert_eq!(fs::read(&install).unwrap(), b"\x00new bundle\xff");
}

#[tokio::test]
async fn test_unreachable_server() {
    let dir = tempfile::tempdir().unwrap();
    let install = dir.path().join("app.asar");
    fs::write(&install, b"old bundle").unwrap();

    // Nothing listens on port 9 (discard) in the test environment
    let mut config = UpdaterConfig::new("http://127.0.0.1:9/check", InstallLayout::new(&install));
    config.request_options.timeout_secs = Some(5);
    let updater = Updater::from_config(&config).unwrap();

    let mut session = bundle_updater::UpdateSession::new("1.0.0");
    let err = updater.check(&mut session).await.unwrap_err();

    assert_eq!(
        err.kind(),
        Some(bundle_updater::ErrorKind::CannotConnectToApi)
    );
}

#[tokio::test]
async fn test_oversized_content_length_does_not_preallocate() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Declares ~1 PB but sends three bytes and closes
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000000000000000\r\n\r\nabc")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let transport = ReqwestTransport::new(&RequestOptions::default()).unwrap();
    let result = transport.get(&format!("http://{}/update.pkg", addr)).await;

    assert!(matches!(result, Err(TransportError::Request(_))));
}
