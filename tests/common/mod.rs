//! Shared utilities for integration tests: a mock management plane,
//! a mock change channel and a throwaway PKI.

#![allow(dead_code)]

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use gateway_sync::certs::CertificateStore;
use gateway_sync::config::ManagementConfig;

pub const NODE_SECRET: &str = "somesecret";
pub const NODE_ID: &str = "node-7f3a";
pub const REGISTER_NONCE: &str = "nonce-register";

/// Programmable stand-in for the management plane.
pub struct MockPlane {
    configs_body: Mutex<String>,
    register_failures: AtomicU32,
    pub registrations: AtomicU32,
    pub fetches: AtomicU32,
    pub deregistrations: Mutex<Vec<(String, String)>>,
}

impl MockPlane {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            configs_body: Mutex::new(r#"{"Status":"OK","Nonce":"1","Message":[]}"#.to_string()),
            register_failures: AtomicU32::new(0),
            registrations: AtomicU32::new(0),
            fetches: AtomicU32::new(0),
            deregistrations: Mutex::new(Vec::new()),
        })
    }

    /// Raw body returned by the next config fetches.
    pub fn set_configs_body(&self, body: &str) {
        *self.configs_body.lock().unwrap() = body.to_string();
    }

    /// Answer the next `n` registrations with 503.
    pub fn fail_registrations(&self, n: u32) {
        self.register_failures.store(n, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn deregistered(&self) -> Vec<(String, String)> {
        self.deregistrations.lock().unwrap().clone()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(NODE_SECRET)
}

async fn register(State(plane): State<Arc<MockPlane>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let remaining = plane.register_failures.load(Ordering::SeqCst);
    if remaining > 0 {
        plane.register_failures.store(remaining - 1, Ordering::SeqCst);
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    plane.registrations.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "Status": "OK",
        "Nonce": REGISTER_NONCE,
        "Message": { "NodeID": NODE_ID }
    }))
    .into_response()
}

async fn deregister(State(plane): State<Arc<MockPlane>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let field = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    plane
        .deregistrations
        .lock()
        .unwrap()
        .push((field("x-gateway-node-id"), field("x-gateway-nonce")));

    Json(json!({ "Status": "OK", "Nonce": "nonce-deregister", "Message": "node removed" })).into_response()
}

async fn fetch_configs(State(plane): State<Arc<MockPlane>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    plane.fetches.fetch_add(1, Ordering::SeqCst);
    let body = plane.configs_body.lock().unwrap().clone();
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

pub fn plane_router(plane: Arc<MockPlane>) -> Router {
    Router::new()
        .route("/register/node", get(register))
        .route("/system/node", delete(deregister))
        .route("/system/apis", get(fetch_configs))
        .with_state(plane)
}

/// Serve the mock plane over plain HTTP. Returns its base URL.
pub async fn start_plane(plane: Arc<MockPlane>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, plane_router(plane)).await;
    });
    format!("http://{addr}")
}

/// Serve the mock plane over TLS 1.2, requiring a client certificate
/// issued by the test CA. Returns its base URL.
pub async fn start_mtls_plane(plane: Arc<MockPlane>, pki: &TestPki) -> String {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut roots = RootCertStore::empty();
    roots.add(pki.ca_der.clone()).unwrap();
    let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()
        .unwrap();

    let mut config = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS12])
        .unwrap()
        .with_client_cert_verifier(verifier)
        .with_single_cert(vec![pki.server_der.clone()], pki.server_key())
        .unwrap();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let tls = axum_server::tls_rustls::RustlsConfig::from_config(Arc::new(config));
    let app = plane_router(plane);
    tokio::spawn(async move {
        let _ = axum_server::from_tcp_rustls(listener, tls)
            .serve(app.into_make_service())
            .await;
    });

    wait_for_port(addr).await;
    format!("https://{addr}")
}

async fn wait_for_port(addr: SocketAddr) {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Management settings pointing at a mock plane.
pub fn management_config(base_url: &str) -> ManagementConfig {
    let secure = base_url.starts_with("https://");
    ManagementConfig {
        use_management_plane: true,
        connection_string: base_url.to_string(),
        node_secret: NODE_SECRET.to_string(),
        ssl_insecure_skip_verify: secure,
        allow_insecure_configs: true,
        ..ManagementConfig::default()
    }
}

/// A CA plus server and client certificates for mutual TLS tests.
pub struct TestPki {
    pub ca_der: CertificateDer<'static>,
    pub server_der: CertificateDer<'static>,
    server_key_der: Vec<u8>,
    /// Client certificate and key issued by the CA, PEM encoded.
    pub client_pem: String,
    /// Self-signed client certificate the server does not trust.
    pub untrusted_client_pem: String,
}

impl TestPki {
    pub fn generate() -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params.distinguished_name.push(DnType::CommonName, "gateway-sync test ca");
        let ca = ca_params.self_signed(&ca_key).unwrap();

        let server_key = KeyPair::generate().unwrap();
        let mut server_params =
            CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()]).unwrap();
        server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        let server = server_params.signed_by(&server_key, &ca, &ca_key).unwrap();

        let client_key = KeyPair::generate().unwrap();
        let mut client_params = CertificateParams::new(vec!["gateway-node".to_string()]).unwrap();
        client_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        let client = client_params.signed_by(&client_key, &ca, &ca_key).unwrap();

        let rogue_key = KeyPair::generate().unwrap();
        let mut rogue_params = CertificateParams::new(vec!["gateway-node".to_string()]).unwrap();
        rogue_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        let rogue = rogue_params.self_signed(&rogue_key).unwrap();

        Self {
            ca_der: ca.der().clone(),
            server_der: server.der().clone(),
            server_key_der: server_key.serialize_der(),
            client_pem: format!("{}{}", client.pem(), client_key.serialize_pem()),
            untrusted_client_pem: format!("{}{}", rogue.pem(), rogue_key.serialize_pem()),
        }
    }

    fn server_key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.server_key_der.clone()))
    }

    /// A certificate store holding the trusted client certificate.
    /// Returns the store and the certificate ID.
    pub fn client_store(&self) -> (CertificateStore, String) {
        let store = CertificateStore::new();
        let id = store.add(self.client_pem.as_bytes()).unwrap();
        (store, id)
    }
}

/// Mock WebSocket change channel. Every published payload is sent as a
/// text frame to all connected subscribers.
pub struct MockChannel {
    tx: broadcast::Sender<String>,
    pub connections: AtomicU32,
}

impl MockChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tx: broadcast::channel(64).0,
            connections: AtomicU32::new(0),
        })
    }

    pub fn publish(&self, payload: &str) -> usize {
        self.tx.send(payload.to_string()).unwrap_or(0)
    }

    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }
}

async fn channel_upgrade(State(channel): State<Arc<MockChannel>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| forward(socket, channel))
}

async fn forward(mut socket: WebSocket, channel: Arc<MockChannel>) {
    channel.connections.fetch_add(1, Ordering::SeqCst);
    let mut rx = channel.tx.subscribe();
    while let Ok(payload) = rx.recv().await {
        if socket.send(Message::Text(payload.into())).await.is_err() {
            break;
        }
    }
}

/// Serve the mock change channel. Returns its `ws://` URL.
pub async fn start_channel(channel: Arc<MockChannel>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/notifications", get(channel_upgrade))
        .with_state(channel);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("ws://{addr}/notifications")
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
