//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use admission_guard::config::{GuardConfig, LimitsConfig};
use admission_guard::guard::AdmissionGuard;
use admission_guard::http::GuardServer;
use admission_guard::lifecycle::Shutdown;
use admission_guard::security::access_control::StaticTokenPolicy;
use tokio::net::TcpListener;

pub const ADMIN_KEY: &str = "test-admin-key";

/// A guard server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub guard: Arc<AdmissionGuard>,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Limits small enough to reach every branch in a handful of requests.
#[allow(dead_code)]
pub fn small_limits() -> LimitsConfig {
    LimitsConfig {
        window_secs: 60,
        global_max: 1000,
        client_max: 3,
        block_threshold: 5,
        block_duration_secs: 300,
    }
}

/// Start a guard server with `limits` and the test admin key.
pub async fn start_guard(limits: LimitsConfig) -> TestServer {
    let mut config = GuardConfig::default();
    config.limits = limits;
    config.admin.api_key = ADMIN_KEY.to_string();
    config.observability.metrics_enabled = false;

    let guard = Arc::new(AdmissionGuard::from_config(&config.limits));
    let policy = Arc::new(StaticTokenPolicy::new(ADMIN_KEY));
    let server = GuardServer::new(&config, guard.clone(), policy);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestServer {
        addr,
        guard,
        shutdown,
    }
}
