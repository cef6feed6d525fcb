use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use url::Url;

pub const DEFAULT_API_BASE: &str = "http://localhost:8090";
pub const DEFAULT_SETTINGS_FILE: &str = "dispatch.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base: String,
    pub token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            token: None,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Defaults, overlaid by `dispatch.toml` in the working directory, then by
/// the process environment.
pub fn load_settings() -> anyhow::Result<Settings> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), &env)
}

pub fn load_settings_from(
    path: &Path,
    env: &HashMap<String, String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        let file_cfg = toml::from_str::<HashMap<String, String>>(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
        apply_overrides(
            &mut settings,
            &file_cfg,
            &[("api_base", "token", "request_timeout_secs")],
        );
    }

    apply_overrides(
        &mut settings,
        env,
        &[
            (
                "DISPATCH_API_BASE",
                "DISPATCH_API_TOKEN",
                "DISPATCH_REQUEST_TIMEOUT_SECS",
            ),
            ("APP__API_BASE", "APP__API_TOKEN", "APP__REQUEST_TIMEOUT_SECS"),
        ],
    );

    settings.api_base = normalize_api_base(&settings.api_base)?;
    Ok(settings)
}

/// Later key groups win over earlier ones.
fn apply_overrides(
    settings: &mut Settings,
    source: &HashMap<String, String>,
    key_groups: &[(&str, &str, &str)],
) {
    for (base_key, token_key, timeout_key) in key_groups {
        if let Some(v) = source.get(*base_key) {
            settings.api_base = v.clone();
        }
        if let Some(v) = source.get(*token_key) {
            let v = v.trim();
            settings.token = (!v.is_empty()).then(|| v.to_string());
        }
        if let Some(v) = source.get(*timeout_key) {
            if let Ok(parsed) = v.trim().parse::<u64>() {
                settings.request_timeout_secs = parsed;
            }
        }
    }
}

/// Validates the API base and strips trailing slashes so paths can be
/// appended verbatim.
pub fn normalize_api_base(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(DEFAULT_API_BASE.to_string());
    }

    let parsed = Url::parse(raw).with_context(|| format!("invalid API base url '{raw}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("API base url '{raw}' must use http or https");
    }
    if parsed.host_str().is_none() {
        bail!("API base url '{raw}' has no host");
    }

    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
