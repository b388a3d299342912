//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::convert::Infallible;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose,
};
use tokio::net::UnixListener;
use tokio::task::{JoinHandle, JoinSet};

use sockgate::config::ProxyConfig;
use sockgate::net::connection::ConnectionTracker;
use sockgate::{BackendConnector, Shutdown};

/// Throwaway CA plus server and client certificates, written as PEM files.
pub struct Pki {
    pub dir: tempfile::TempDir,
    pub ca_pem: String,
    pub client_pem: String,
    pub client_key_pem: String,
}

impl Pki {
    pub fn generate() -> Self {
        let dir = tempfile::tempdir().unwrap();

        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        ca_params
            .distinguished_name
            .push(DnType::CommonName, "sockgate test CA");
        let ca = ca_params.self_signed(&ca_key).unwrap();

        let server_key = KeyPair::generate().unwrap();
        let mut server_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        let server = server_params.signed_by(&server_key, &ca, &ca_key).unwrap();

        let client_key = KeyPair::generate().unwrap();
        let mut client_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        client_params
            .distinguished_name
            .push(DnType::CommonName, "sockgate test client");
        client_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        let client = client_params.signed_by(&client_key, &ca, &ca_key).unwrap();

        fs::write(dir.path().join("ca.pem"), ca.pem()).unwrap();
        fs::write(dir.path().join("server.pem"), server.pem()).unwrap();
        fs::write(dir.path().join("server-key.pem"), server_key.serialize_pem()).unwrap();

        Self {
            ca_pem: ca.pem(),
            client_pem: client.pem(),
            client_key_pem: client_key.serialize_pem(),
            dir,
        }
    }

    /// Path for a backend socket inside the PKI temp dir.
    pub fn socket_path(&self) -> PathBuf {
        self.dir.path().join("engine.sock")
    }

    /// A proxy config on an ephemeral port, requiring client certificates.
    pub fn proxy_config(&self, socket_path: &Path) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.listener.address = "http://127.0.0.1:0".to_string();
        config.backend.socket_path = socket_path.to_path_buf();
        config.tls.cert_path = self.dir.path().join("server.pem");
        config.tls.key_path = self.dir.path().join("server-key.pem");
        config.tls.ca_path = Some(self.dir.path().join("ca.pem"));
        config.tls.verify_peer = true;
        config
    }

    /// HTTPS client trusting the test CA, optionally presenting the client certificate.
    pub fn client(&self, proxy_addr: SocketAddr, with_identity: bool) -> reqwest::Client {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .add_root_certificate(reqwest::Certificate::from_pem(self.ca_pem.as_bytes()).unwrap())
            .resolve("localhost", proxy_addr)
            .no_proxy();

        if with_identity {
            let pem = format!("{}{}", self.client_pem, self.client_key_pem);
            builder = builder.identity(reqwest::Identity::from_pem(pem.as_bytes()).unwrap());
        }
        builder.build().unwrap()
    }
}

/// URL for a path on the proxy under test.
pub fn url(proxy_addr: SocketAddr, path: &str) -> String {
    format!("https://localhost:{}{}", proxy_addr.port(), path)
}

/// A fake container engine listening on a Unix socket.
///
/// Dropping it aborts the accept loop and every open connection, then removes
/// the socket file.
pub struct MockEngine {
    path: PathBuf,
    accepted: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockEngine {
    pub fn start(path: &Path) -> Self {
        let _ = fs::remove_file(path);
        let listener = UnixListener::bind(path).unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);

        let task = tokio::spawn(async move {
            let mut connections = JoinSet::new();
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                connections.spawn(async move {
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service_fn(engine_api))
                        .await;
                });
            }
        });

        Self {
            path: path.to_path_buf(),
            accepted,
            task,
        }
    }

    /// Number of backend connections the proxy has opened.
    pub fn connections_accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.task.abort();
        let _ = fs::remove_file(&self.path);
    }
}

/// A tiny slice of a container engine API.
async fn engine_api(
    request: Request<Incoming>,
) -> Result<Response<BoxBody<Bytes, Infallible>>, Infallible> {
    let method = request.method().clone();
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();
    let echo = request.headers().get("x-echo").cloned();
    let body = request
        .into_body()
        .collect()
        .await
        .map(|c| c.to_bytes())
        .unwrap_or_default();

    let path = target.split('?').next().unwrap_or_default().to_string();
    if path == "/events" {
        return Ok(event_stream());
    }
    let (status, content_type, payload) = match path.as_str() {
        "/_ping" => (StatusCode::OK, "text/plain; charset=utf-8", "OK".to_string()),
        "/slow" => {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            (StatusCode::OK, "text/plain; charset=utf-8", "slow".to_string())
        }
        "/containers/missing/json" => (
            StatusCode::NOT_FOUND,
            "application/json",
            r#"{"message":"No such container: missing"}"#.to_string(),
        ),
        p if p.starts_with("/echo") => (
            StatusCode::OK,
            "text/plain; charset=utf-8",
            format!("{} {} {}", method, target, String::from_utf8_lossy(&body)),
        ),
        _ => (StatusCode::OK, "application/json", "[]".to_string()),
    };

    let mut builder = Response::builder()
        .status(status)
        .header("content-type", content_type)
        .header("api-version", "1.45")
        .header("server", "mock-engine");
    if let Some(echo) = echo {
        builder = builder.header("x-echo", echo);
    }
    Ok(builder.body(Full::new(Bytes::from(payload)).boxed()).unwrap())
}

/// A body of unknown length, which hyper sends with chunked encoding.
fn event_stream() -> Response<BoxBody<Bytes, Infallible>> {
    let events = [
        r#"{"status":"start","id":"abc"}"#,
        "\n",
        r#"{"status":"die","id":"abc"}"#,
        "\n",
    ];
    let frames = events
        .into_iter()
        .map(|event| Ok::<_, Infallible>(Frame::data(Bytes::from_static(event.as_bytes()))));

    Response::builder()
        .header("content-type", "application/json")
        .header("api-version", "1.45")
        .body(StreamBody::new(stream::iter(frames)).boxed())
        .unwrap()
}

/// A running proxy.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub backend: Arc<BackendConnector>,
    pub connections: ConnectionTracker,
    pub shutdown: Shutdown,
    pub task: JoinHandle<std::io::Result<()>>,
}

/// Prepare and start a proxy, returning once it is listening.
pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let server = sockgate::prepare(config).expect("proxy should start");
    let handle = server.handle();
    let backend = server.backend();
    let connections = server.connections();

    let shutdown = Shutdown::new();
    let task = tokio::spawn(server.run(shutdown.listener()));
    let addr = handle.listening().await.expect("proxy should bind");

    TestProxy {
        addr,
        backend,
        connections,
        shutdown,
        task,
    }
}
