//! Logging initialization, shared by both binaries.

/// Installs `env_logger` reading `RUST_LOG` (defaulting to `info`), matching
/// the `log::info!`/`log::warn!` call sites used throughout the core.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env).init();
}
