use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_UPLOAD_BASE_URL: &str = "https://api.cloudinary.com/v1_1";
const DEFAULT_TIMEOUT_SECS: u64 = 20;
const MAX_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Deserialize, Default)]
struct ScreeningConfigFile {
    upload: Option<UploadConfigFile>,
    workflow: Option<WorkflowConfigFile>,
    timeouts: Option<TimeoutConfigFile>,
    fallback: Option<FallbackConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct UploadConfigFile {
    base_url: Option<String>,
    cloud_name: Option<String>,
    upload_preset: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct WorkflowConfigFile {
    url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TimeoutConfigFile {
    upload_secs: Option<u64>,
    detect_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct FallbackConfigFile {
    synthetic: Option<bool>,
    seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ScreeningConfig {
    pub upload: UploadSettings,
    pub workflow: WorkflowSettings,
    pub upload_timeout: Duration,
    pub detect_timeout: Duration,
    pub fallback: FallbackSettings,
}

/// Image hosting endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    pub base_url: String,
    pub cloud_name: String,
    pub upload_preset: String,
}

/// Detection workflow endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub url: String,
    pub api_key: String,
}

/// Degraded-mode policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackSettings {
    /// Substitute synthetic detections when live inference fails or is empty.
    pub synthetic: bool,
    /// Seed for reproducible synthetic output.
    pub seed: Option<u64>,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            upload: UploadSettings {
                base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
                cloud_name: String::new(),
                upload_preset: String::new(),
            },
            workflow: WorkflowSettings {
                url: String::new(),
                api_key: String::new(),
            },
            upload_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            detect_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fallback: FallbackSettings {
                synthetic: true,
                seed: None,
            },
        }
    }
}

impl ScreeningConfig {
    /// Defaults, then the JSON file named by `SMEARSCAN_CONFIG`, then
    /// `SMEARSCAN_*` environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SMEARSCAN_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScreeningConfigFile) -> Self {
        let defaults = Self::default();
        let upload = file.upload.unwrap_or_default();
        let workflow = file.workflow.unwrap_or_default();
        let timeouts = file.timeouts.unwrap_or_default();
        let fallback = file.fallback.unwrap_or_default();
        Self {
            upload: UploadSettings {
                base_url: upload.base_url.unwrap_or(defaults.upload.base_url),
                cloud_name: upload.cloud_name.unwrap_or_default(),
                upload_preset: upload.upload_preset.unwrap_or_default(),
            },
            workflow: WorkflowSettings {
                url: workflow.url.unwrap_or_default(),
                api_key: workflow.api_key.unwrap_or_default(),
            },
            upload_timeout: timeouts
                .upload_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.upload_timeout),
            detect_timeout: timeouts
                .detect_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.detect_timeout),
            fallback: FallbackSettings {
                synthetic: fallback.synthetic.unwrap_or(defaults.fallback.synthetic),
                seed: fallback.seed,
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(base_url) = non_empty_env("SMEARSCAN_UPLOAD_BASE_URL") {
            self.upload.base_url = base_url;
        }
        if let Some(cloud_name) = non_empty_env("SMEARSCAN_CLOUD_NAME") {
            self.upload.cloud_name = cloud_name;
        }
        if let Some(preset) = non_empty_env("SMEARSCAN_UPLOAD_PRESET") {
            self.upload.upload_preset = preset;
        }
        if let Some(url) = non_empty_env("SMEARSCAN_WORKFLOW_URL") {
            self.workflow.url = url;
        }
        if let Some(api_key) = non_empty_env("SMEARSCAN_API_KEY") {
            self.workflow.api_key = api_key;
        }
        if let Some(timeout) = non_empty_env("SMEARSCAN_TIMEOUT_SECS") {
            let seconds: u64 = timeout.parse().map_err(|_| {
                anyhow!("SMEARSCAN_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.upload_timeout = Duration::from_secs(seconds);
            self.detect_timeout = Duration::from_secs(seconds);
        }
        if let Some(flag) = non_empty_env("SMEARSCAN_SYNTHETIC_FALLBACK") {
            self.fallback.synthetic = parse_bool(&flag).ok_or_else(|| {
                anyhow!("SMEARSCAN_SYNTHETIC_FALLBACK must be true/false/1/0")
            })?;
        }
        if let Some(seed) = non_empty_env("SMEARSCAN_FALLBACK_SEED") {
            let seed: u64 = seed
                .parse()
                .map_err(|_| anyhow!("SMEARSCAN_FALLBACK_SEED must be an unsigned integer"))?;
            self.fallback.seed = Some(seed);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, timeout) in [
            ("upload", self.upload_timeout),
            ("detect", self.detect_timeout),
        ] {
            if timeout.is_zero() {
                return Err(anyhow!("{} timeout must be greater than zero", name));
            }
            if timeout.as_secs() > MAX_TIMEOUT_SECS {
                return Err(anyhow!(
                    "{} timeout must not exceed {}s",
                    name,
                    MAX_TIMEOUT_SECS
                ));
            }
        }
        validate_http_url("upload base_url", &self.upload.base_url)?;
        if !self.workflow.url.is_empty() {
            validate_http_url("workflow url", &self.workflow.url)?;
        }
        Ok(())
    }

    /// True when every credential needed for live inference is present.
    pub fn live_inference_configured(&self) -> bool {
        ![
            &self.upload.cloud_name,
            &self.upload.upload_preset,
            &self.workflow.url,
            &self.workflow.api_key,
        ]
        .iter()
        .any(|value| value.trim().is_empty())
    }
}

fn read_config_file(path: &Path) -> Result<ScreeningConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn validate_http_url(name: &str, value: &str) -> Result<()> {
    let parsed =
        url::Url::parse(value).map_err(|e| anyhow!("{} '{}' is invalid: {}", name, value, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow!(
            "{} must use http or https, got '{}'",
            name,
            other
        )),
    }
}
