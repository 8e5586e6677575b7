use axum::Router;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::gateway::{ChatGateway, GatewayConfig};
use crate::http::chat_route::AppState;
use crate::http::router::build_router;

const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) fn build_app(config: &GatewayConfig) -> Router {
    let gateway = ChatGateway::from_config(config);
    if let Err(err) = config.check_credentials() {
        // 中文注释：缺少凭据时仍然启动，由 /api/chat 逐请求返回配置错误。
        log::warn!("event=service_credentials_missing err={}", err);
    }
    log::info!(
        "event=service_config transport={} model={} max_retries={} initial_delay_ms={} max_body_bytes={}",
        config.transport.as_str(),
        config.completion.model,
        config.retry.max_retries,
        config.retry.initial_delay.as_millis(),
        config.max_body_bytes
    );
    build_router(AppState {
        gateway: Arc::new(gateway),
        max_body_bytes: config.max_body_bytes,
    })
}

fn build_runtime() -> io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
}

/// `localhost:PORT` expands to both loopback families; anything else binds as given.
fn bind_targets(addr: &str) -> Vec<String> {
    // 中文注释：localhost 在部分系统上只解析到 IPv6，两个回环地址都监听，浏览器走哪个栈都能连上。
    match addr.strip_prefix("localhost:") {
        Some(port) => vec![format!("127.0.0.1:{port}"), format!("[::1]:{port}")],
        None => vec![addr.to_string()],
    }
}

async fn bind_all(addr: &str) -> io::Result<Vec<TcpListener>> {
    let mut listeners = Vec::new();
    let mut last_err = None;
    for target in bind_targets(addr) {
        match TcpListener::bind(&target).await {
            Ok(listener) => listeners.push(listener),
            Err(err) => {
                log::debug!("event=service_bind_skipped addr={} err={}", target, err);
                last_err = Some(err);
            }
        }
    }
    match (listeners.is_empty(), last_err) {
        (true, Some(err)) => Err(err),
        (true, None) => Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no address to bind for {addr}"),
        )),
        (false, _) => Ok(listeners),
    }
}

async fn shutdown_signal() {
    while !crate::shutdown_requested() {
        tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
    }
}

async fn serve_listener(listener: TcpListener, app: Router) -> io::Result<()> {
    if let Ok(local) = listener.local_addr() {
        log::info!("event=service_listening addr={}", local);
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn serve_all(listeners: Vec<TcpListener>, app: Router) -> io::Result<()> {
    let mut handles = Vec::with_capacity(listeners.len());
    for listener in listeners {
        handles.push(tokio::spawn(serve_listener(listener, app.clone())));
    }
    let mut result = Ok(());
    for handle in handles {
        let served = handle
            .await
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        if let Err(err) = served {
            log::error!("event=service_listener_failed err={}", err);
            result = Err(err);
        }
    }
    result
}

pub fn start_http(addr: &str, config: &GatewayConfig) -> io::Result<()> {
    let runtime = build_runtime()?;
    let app = build_app(config);
    runtime.block_on(async move {
        let listeners = bind_all(addr).await?;
        serve_all(listeners, app).await
    })
}

/// Serves on an already-bound listener; used when the caller needs the port before serving.
pub(crate) fn serve_bound(listener: std::net::TcpListener, config: &GatewayConfig) -> io::Result<()> {
    let runtime = build_runtime()?;
    let app = build_app(config);
    runtime.block_on(async move {
        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;
        serve_all(vec![listener], app).await
    })
}
