//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use command_gateway::auth::{Authenticator, Principal};
use command_gateway::cache::{CacheStore, InMemoryCache};
use command_gateway::commands::{BusError, BusMessage, CommandBus, OperationUpdate, PendingOperations};
use command_gateway::config::GatewayConfig;
use command_gateway::queries::FilterRegistry;
use command_gateway::{routes, AppState};

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request target (path and query) and returns a status and
/// body. Every accepted connection is counted in the returned counter.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Arc<AtomicU32>)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let f = f.clone();
                    tokio::spawn(async move {
                        let target = read_request_target(&mut socket).await;
                        let (status, body) = f(target).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, calls)
}

/// Read request headers and return the target of the request line.
async fn read_request_target(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let head = String::from_utf8_lossy(&buf);
    head.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string()
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// How the test bus answers published commands.
#[derive(Clone, Copy)]
pub enum Reply {
    Succeed,
    Reject,
    Silent,
}

/// Bus that counts publishes and answers through the pending table.
pub struct TestBus {
    pub calls: AtomicU32,
    published: Mutex<Vec<BusMessage>>,
    reply: Reply,
    pending: PendingOperations,
}

impl TestBus {
    pub fn new(reply: Reply, pending: PendingOperations) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            published: Mutex::new(Vec::new()),
            reply,
            pending,
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages published so far, oldest first.
    pub fn published(&self) -> Vec<BusMessage> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandBus for TestBus {
    async fn publish(&self, message: &BusMessage) -> Result<(), BusError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.published.lock().unwrap().push(message.clone());
        let success = match self.reply {
            Reply::Succeed => true,
            Reply::Reject => false,
            Reply::Silent => return Ok(()),
        };
        self.pending.complete(OperationUpdate {
            request_id: message.correlation_id(),
            success,
            code: (!success).then(|| "remark_not_found".to_string()),
            message: None,
        });
        Ok(())
    }
}

/// Configuration pointing storage at `storage` with a short dispatch window.
pub fn test_config(storage: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.storage.base_url = format!("http://{storage}");
    config.storage.timeout_secs = 2;
    config.dispatch.timeout_ms = 200;
    config.dispatch.retries.base_delay_ms = 1;
    config.dispatch.retries.max_delay_ms = 5;
    config.auth.jwt_secret = "test-secret".to_string();
    config.bus.callback_key = "bus-key".to_string();
    config.admin.enabled = true;
    config.admin.api_key = "admin-key".to_string();
    config
}

/// Build application state around `bus`.
pub fn test_state(config: GatewayConfig, bus: Arc<dyn CommandBus>, pending: PendingOperations) -> AppState {
    test_state_with_filters(config, bus, pending, routes::filters())
}

/// Like [`test_state`], with post-fetch `filters`.
pub fn test_state_with_filters(
    config: GatewayConfig,
    bus: Arc<dyn CommandBus>,
    pending: PendingOperations,
    filters: FilterRegistry,
) -> AppState {
    let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
    AppState::new(config, bus, pending, cache, routes::validators(), filters).unwrap()
}

/// Bearer token for a caller with `role`.
pub fn token_for(config: &GatewayConfig, user_id: &str, role: &str) -> String {
    Authenticator::new(&config.auth)
        .issue(&Principal::new(user_id, role, "active"), Duration::from_secs(600))
        .unwrap()
}
