use env_logger::Env;

/// Initialize global logger using `env_logger`.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If unset, `info` is used by default.
pub fn init() {
    init_with_default("info");
}

/// Same as [`init`] with a caller-chosen fallback filter. Calling it twice is
/// harmless; only the first call installs a logger.
pub fn init_with_default(filter: &str) {
    let env = Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .format_module_path(false)
        .try_init();
}
