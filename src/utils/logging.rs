use tracing_subscriber::EnvFilter;

/// 日志统一写 stderr，stdout 只留给报告本身。
/// `RUST_LOG` 优先，未设置时回退到 `info`。重复调用无副作用。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
