//! End-to-end tests over the built-in inventory directory and TCP relay

use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use kf_core::{ConfigError, ForwardError, ForwardRequest, LaunchError};
use kf_orchestrator::{with_forwarders, with_forwarders_embedded};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

async fn echo_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut r, mut w) = stream.split();
                let _ = tokio::io::copy(&mut r, &mut w).await;
            });
        }
    });
    port
}

fn cluster_toml(echo_port: u16) -> String {
    format!(
        r#"
[[pods]]
name = "web-1"
address = "127.0.0.1"
ports = [{echo_port}]
labels = {{ app = "web" }}

[[services]]
name = "web-svc"
selector = {{ app = "web" }}
ports = [{{ port = 80, target_port = {echo_port} }}]
"#
    )
}

async fn assert_echoes(local_port: u16) {
    let mut client = TcpStream::connect(("127.0.0.1", local_port)).await.unwrap();
    client.write_all(b"hello").await.unwrap();
    let mut buf = [0u8; 5];
    timeout(TEST_TIMEOUT, client.read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf, b"hello");
}

#[tokio::test]
async fn test_with_forwarders_from_config_file() {
    let echo_port = echo_server().await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(cluster_toml(echo_port).as_bytes()).unwrap();

    let session = with_forwarders(
        CancellationToken::new(),
        vec![
            ForwardRequest::pod("web-1", echo_port),
            ForwardRequest::locator("svc/web-svc"),
        ],
        Some(file.path()),
    )
    .await
    .unwrap();

    let ports = timeout(TEST_TIMEOUT, session.ready()).await.unwrap().unwrap();
    assert_eq!(ports.len(), 2);
    for port in &ports {
        assert_ne!(port.local, 0);
        assert_eq!(port.remote, echo_port);
        assert_echoes(port.local).await;
    }

    assert!(session.close());
    assert!(!session.close());
}

#[tokio::test]
async fn test_embedded_config_with_inferred_port() {
    let echo_port = echo_server().await;
    let config = cluster_toml(echo_port);

    let session = with_forwarders_embedded(
        CancellationToken::new(),
        vec![ForwardRequest::locator("pod/web-1")],
        config.as_bytes(),
    )
    .await
    .unwrap();

    let ports = timeout(TEST_TIMEOUT, session.ready()).await.unwrap().unwrap();
    assert_eq!(ports[0].remote, echo_port);
    assert_echoes(ports[0].local).await;
}

#[tokio::test]
async fn test_bad_embedded_config_is_config_error() {
    let result = with_forwarders_embedded(
        CancellationToken::new(),
        vec![ForwardRequest::pod("web-1", 80)],
        b"[[pods]\nname = ",
    )
    .await;

    assert!(matches!(
        result,
        Err(ForwardError::Config(ConfigError::Parse(_)))
    ));
}

#[tokio::test]
async fn test_missing_config_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = with_forwarders(
        CancellationToken::new(),
        vec![ForwardRequest::pod("web-1", 80)],
        Some(dir.path().join("missing.toml").as_path()),
    )
    .await;

    assert!(matches!(
        result,
        Err(ForwardError::Config(ConfigError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_port_conflict_names_the_target() {
    let echo_port = echo_server().await;
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let busy_port = taken.local_addr().unwrap().port();

    let result = with_forwarders_embedded(
        CancellationToken::new(),
        vec![ForwardRequest::pod("web-1", echo_port).with_local_port(busy_port)],
        cluster_toml(echo_port).as_bytes(),
    )
    .await;

    let err = match result {
        Err(err) => err,
        Ok(_) => panic!("binding a busy port should fail"),
    };
    assert!(matches!(
        err,
        ForwardError::Launch(LaunchError::Bind { ref target, .. }) if target == "default/web-1"
    ));
    let msg = err.to_string();
    assert!(msg.contains("web-1"), "{}", msg);
    assert!(msg.contains(&busy_port.to_string()), "{}", msg);
}

#[tokio::test]
async fn test_service_forward_reports_origin() {
    let echo_port = echo_server().await;

    let session = with_forwarders_embedded(
        CancellationToken::new(),
        vec![ForwardRequest::locator("svc/web-svc")],
        cluster_toml(echo_port).as_bytes(),
    )
    .await
    .unwrap();

    let targets = session.targets();
    assert_eq!(targets[0].instance, "web-1");
    assert_eq!(targets[0].origin, "service default/web-svc");
}
