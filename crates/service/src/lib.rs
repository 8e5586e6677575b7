use std::io::{self, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

mod gateway;
mod http;
mod process_env;

pub use gateway::upstream::backoff::{BackoffPause, RetryPolicy, TokioPause};
pub use gateway::upstream::config::TransportMode;
pub use gateway::upstream::outcome::{classify_failure, FailureClassifier};
pub use gateway::upstream::protocol::chat_proxy::ChatProxyTransport;
pub use gateway::upstream::protocol::gemini::GeminiTransport;
pub use gateway::upstream::retry::RetryingInvoker;
pub use gateway::upstream::transport::{CompletionTransport, TransportError};
pub use gateway::{build_invoker, ChatError, ChatGateway, ConfigError, GatewayConfig};

pub const DEFAULT_ADDR: &str = "localhost:3001";
pub const ENV_SERVICE_ADDR: &str = "APRASSIST_SERVICE_ADDR";

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

pub mod portable {
    // 中文注释：发行物支持“同目录可选 env 文件”，解压即用；已存在的环境变量优先。
    pub fn bootstrap_current_process() {
        crate::process_env::load_env_files();
    }
}

pub struct ServerHandle {
    pub addr: String,
    join: thread::JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    pub fn join(self) -> io::Result<()> {
        self.join
            .join()
            .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "server thread panicked")))
    }
}

pub fn resolve_service_addr() -> String {
    std::env::var(ENV_SERVICE_ADDR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_ADDR.to_string())
}

pub fn start_server(addr: &str) -> io::Result<()> {
    portable::bootstrap_current_process();
    let config = GatewayConfig::from_env();
    http::server::start_http(addr, &config)
}

/// Binds `addr` (port 0 picks a free one) and serves on a background thread.
pub fn start_background_server(addr: &str, config: GatewayConfig) -> io::Result<ServerHandle> {
    let listener = std::net::TcpListener::bind(addr)?;
    let addr = listener.local_addr()?.to_string();
    let join = thread::Builder::new()
        .name("aprassist-http".to_string())
        .spawn(move || http::server::serve_bound(listener, &config))?;
    Ok(ServerHandle { addr, join })
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

pub fn clear_shutdown_flag() {
    SHUTDOWN_REQUESTED.store(false, Ordering::SeqCst);
}

pub(crate) fn mark_shutdown_requested() {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

pub fn request_shutdown(addr: &str) {
    mark_shutdown_requested();
    // Best-effort wakeups for both IPv4 and IPv6 loopback so whichever listener is active exits.
    let _ = send_shutdown_request(addr);
    let addr_trimmed = addr.trim();
    if addr_trimmed.len() > "localhost:".len()
        && addr_trimmed[..("localhost:".len())].eq_ignore_ascii_case("localhost:")
    {
        let port = &addr_trimmed["localhost:".len()..];
        let _ = send_shutdown_request(&format!("127.0.0.1:{port}"));
        let _ = send_shutdown_request(&format!("[::1]:{port}"));
    }
}

fn send_shutdown_request(addr: &str) -> io::Result<()> {
    let addr = addr.trim();
    if addr.is_empty() {
        return Ok(());
    }
    let addr = addr.strip_prefix("http://").unwrap_or(addr);
    let addr = addr.strip_prefix("https://").unwrap_or(addr);
    let addr = addr.split('/').next().unwrap_or(addr);
    let mut stream = TcpStream::connect(addr)?;
    let _ = stream.set_write_timeout(Some(Duration::from_millis(200)));
    let _ = stream.set_read_timeout(Some(Duration::from_millis(200)));
    let request = format!(
        "GET /__shutdown HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes())?;
    Ok(())
}
