use once_cell::sync::Lazy;

#[derive(Debug)]
pub struct Config {
    /// Quiet window of the engine's idle timer, in milliseconds.
    pub idle_window_ms: u64,
    /// Treat a transport failure as fatal for the whole session.
    pub halt_on_transport_error: bool,
    /// Debug-log every simulated transport call.
    pub log_frames: bool,
}

impl Config {
    fn from_env() -> Self {
        let idle_window_ms = std::env::var("MBCON_IDLE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(500u64);
        let halt_on_transport_error = std::env::var("MBCON_HALT_ON_TRANSPORT_ERROR")
            .map(|v| v == "1")
            .unwrap_or(false);
        let log_frames = std::env::var("MBCON_LOG_FRAMES")
            .map(|v| v == "1")
            .unwrap_or(false);
        Self {
            idle_window_ms,
            halt_on_transport_error,
            log_frames,
        }
    }
}

/// Global config loaded once from environment at first access.
pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

/// Convenience accessor
pub fn config() -> &'static Config {
    &GLOBAL_CONFIG
}
