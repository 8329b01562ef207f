use std::time::Duration;

/// Runtime configuration for the worker.
///
/// The worker reads no files and no environment; the binary fills this in
/// from its command line and calls [`WorkerConfig::validate`] before use.
#[derive(Debug, Clone, Default)]
pub struct WorkerConfig {
    pub decoder: DecoderConfig,
    pub recognizer: RecognizerConfig,
    pub debounce: DebounceConfig,
    pub devices: DevicesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Frames wider or taller than this are skipped without decoding pixels.
    pub max_dimension: u32,
}

#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    /// Backend name: "auto", "rxing" or "rqrr".
    pub backend: String,
    pub frame_policy: FramePolicy,
}

/// Which detections of a frame are offered to the debounce filter.
/// Either way a frame produces at most one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePolicy {
    /// Test each non-empty detection in order; emit the first accepted one.
    #[default]
    FirstAccepted,
    /// Test only the first non-empty detection.
    FirstCandidate,
}

#[derive(Debug, Clone)]
pub struct DebounceConfig {
    pub window_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DevicesConfig {
    /// Device indices `0..max_probe` are probed in listing mode.
    pub max_probe: u32,
    /// Upper bound for platform name lookups (e.g. PowerShell on Windows).
    pub name_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            frame_policy: FramePolicy::default(),
        }
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            window_ms: default_debounce_ms(),
        }
    }
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            max_probe: default_max_probe(),
            name_timeout_secs: default_name_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DebounceConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl DevicesConfig {
    pub fn name_timeout(&self) -> Duration {
        Duration::from_secs(self.name_timeout_secs)
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce.window_ms == 0 {
            return Err(ConfigError::Invalid(
                "debounce window must be greater than zero".into(),
            ));
        }
        if self.decoder.max_dimension == 0 {
            return Err(ConfigError::Invalid(
                "max frame dimension must be greater than zero".into(),
            ));
        }
        if self.recognizer.backend.trim().is_empty() {
            return Err(ConfigError::Invalid("backend name is empty".into()));
        }
        Ok(())
    }
}

impl std::str::FromStr for FramePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-accepted" => Ok(Self::FirstAccepted),
            "first-candidate" => Ok(Self::FirstCandidate),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("unknown frame policy {0:?}, expected 'first-accepted' or 'first-candidate'")]
    UnknownPolicy(String),
}

// Default value functions
pub fn default_max_dimension() -> u32 {
    8192
}
pub fn default_backend() -> String {
    "auto".into()
}
pub fn default_debounce_ms() -> u64 {
    1500
}
pub fn default_max_probe() -> u32 {
    10
}
pub fn default_name_timeout_secs() -> u64 {
    3
}
pub fn default_log_level() -> String {
    "info".into()
}
