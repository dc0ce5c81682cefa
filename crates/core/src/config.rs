use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TICK_MS: u64 = 100;
pub const DEFAULT_SCAN_PERIOD_MS: u64 = 1500;
pub const DEFAULT_SPEECH_LANG: &str = "es-MX";
pub const DEFAULT_SPEECH_VOLUME: f32 = 0.8;
pub const DEFAULT_CAMERA_WIDTH: u32 = 640;
pub const DEFAULT_CAMERA_HEIGHT: u32 = 480;
pub const ENV_DETECTOR_URL: &str = "MOOD_MIRROR_DETECTOR_URL";

/// Period of the detection polling timer. The reference behavior uses 100 ms;
/// this is a tunable, not a contract.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickInterval {
    pub period_ms: u64,
}

impl TickInterval {
    pub fn new(period_ms: u64) -> Result<Self, ConfigError> {
        if period_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        Ok(Self { period_ms })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl Default for TickInterval {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_TICK_MS,
        }
    }
}

/// Repeat period of the scan sweep cue while a camera session is active.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanPeriod {
    pub period_ms: u64,
}

impl ScanPeriod {
    pub fn new(period_ms: u64) -> Result<Self, ConfigError> {
        if period_ms == 0 {
            return Err(ConfigError::ZeroScanPeriod);
        }
        Ok(Self { period_ms })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl Default for ScanPeriod {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_SCAN_PERIOD_MS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeechLang(pub String);

impl SpeechLang {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptySpeechLang);
        }
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SpeechLang {
    fn default() -> Self {
        Self(DEFAULT_SPEECH_LANG.to_owned())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Volume(f32);

impl Volume {
    pub fn new(value: f32) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::VolumeOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(DEFAULT_SPEECH_VOLUME)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub detector_url: Option<String>,
    pub tick: TickInterval,
    pub scan_period: ScanPeriod,
    pub speech_lang: SpeechLang,
    pub speech_volume: Volume,
    pub camera: CameraConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            detector_url: None,
            tick: TickInterval::default(),
            scan_period: ScanPeriod::default(),
            speech_lang: SpeechLang::default(),
            speech_volume: Volume::default(),
            camera: CameraConfig::default(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("tick period must be > 0 ms")]
    ZeroTick,
    #[error("scan period must be > 0 ms")]
    ZeroScanPeriod,
    #[error("speech language must not be empty")]
    EmptySpeechLang,
    #[error("volume must be within 0.0..=1.0, got {0}")]
    VolumeOutOfRange(f32),
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}
