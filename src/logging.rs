use tracing_appender::non_blocking::WorkerGuard;

/// Install the global subscriber. Events are handed to a background writer;
/// keep the returned guard alive until shutdown so buffered lines get flushed.
pub fn init_tracing() -> WorkerGuard {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "userbase=debug,tower_http=info,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .init();
    }

    guard
}
