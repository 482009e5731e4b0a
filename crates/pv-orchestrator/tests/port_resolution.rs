//! Port resolution against listeners that belong to someone else

mod common;

use std::time::Duration;

use tokio::net::TcpListener;

use pv_core::PortResolution;
use pv_orchestrator::{HealthChecker, PortResolver};

use common::{serve_healthy, Project};

/// Accepts connections and drops them without answering
async fn serve_silent() -> (u16, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });
    (port, handle)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unrelated_listener_pushes_port_upward() {
    let project = Project::new();
    let (port, handle) = serve_silent().await;
    let health = HealthChecker::with_timeout(Duration::from_millis(500)).unwrap();

    let resolution = PortResolver::new("127.0.0.1", "/health", &project.root, &health)
        .resolve(port)
        .await
        .unwrap();

    match resolution {
        PortResolution::Free(resolved) => assert!(resolved > port),
        other => panic!("expected a free port, got {:?}", other),
    }
    // The occupant keeps running
    assert!(!handle.is_finished());
    assert!(tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_healthy_server_of_another_project_is_not_adopted() {
    // The server runs in this test process, whose working directory is the
    // crate, not the project
    let project = Project::new();
    let port = serve_healthy().await;
    let health = HealthChecker::new().unwrap();

    let resolution = PortResolver::new("127.0.0.1", "/health", &project.root, &health)
        .resolve(port)
        .await
        .unwrap();

    assert!(!resolution.is_existing());
    assert!(resolution.port() > port);
    assert!(health.is_healthy(&format!("http://127.0.0.1:{}/health", port)).await);
}
