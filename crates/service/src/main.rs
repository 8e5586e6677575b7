fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // 中文注释：fmt 订阅器自带 tracing-log 桥接，库里的 log 宏记录会一并输出。
    if let Err(err) = tracing_subscriber::fmt().with_env_filter(env_filter).try_init() {
        eprintln!("logging init skipped: {err}");
    }
}

fn main() {
    init_logging();
    aprassist_service::portable::bootstrap_current_process();
    let addr = aprassist_service::resolve_service_addr();
    log::info!(
        "event=service_start addr={} version={}",
        addr,
        aprassist_core::core_version()
    );
    if let Err(err) = aprassist_service::start_server(&addr) {
        log::error!("event=service_stopped err={}", err);
        std::process::exit(1);
    }
}
