// src/config/mod.rs
//! `EtlConfig`: stage toggles and gate thresholds, loaded from TOML or JSON.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

pub const ENV_CONFIG_PATH: &str = "ETL_CONFIG_PATH";
pub const ENV_MIN_RELEVANCE: &str = "ETL_MIN_RELEVANCE";
pub const DEFAULT_TOML_PATH: &str = "config/etl.toml";
pub const DEFAULT_JSON_PATH: &str = "config/etl.json";

fn default_true() -> bool {
    true
}
fn default_min_relevance() -> f32 {
    0.6
}
fn default_min_description_length() -> usize {
    50
}
fn default_workers() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EtlConfig {
    /// Off means every item takes the legacy path.
    #[serde(default = "default_true")]
    pub enable_extraction: bool,
    /// Off means only the required-field check runs.
    #[serde(default = "default_true")]
    pub enable_validation: bool,
    #[serde(default = "default_true")]
    pub enable_enrichment: bool,
    #[serde(default = "default_min_relevance")]
    pub min_relevance_score: f32,
    #[serde(default = "default_true")]
    pub enable_dedup: bool,
    /// Off means an enhanced-path fault drops the item as an error.
    #[serde(default = "default_true")]
    pub enable_fallback: bool,
    #[serde(default = "default_min_description_length")]
    pub min_description_length: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            enable_extraction: true,
            enable_validation: true,
            enable_enrichment: true,
            min_relevance_score: default_min_relevance(),
            enable_dedup: true,
            enable_fallback: true,
            min_description_length: default_min_description_length(),
            workers: default_workers(),
        }
    }
}

impl EtlConfig {
    pub fn validate(&self) -> Result<()> {
        let t = self.min_relevance_score;
        if !t.is_finite() || !(0.0..=1.0).contains(&t) {
            return Err(PipelineError::Config(format!(
                "min_relevance_score must be within [0, 1], got {t}"
            )));
        }
        if self.workers == 0 {
            return Err(PipelineError::Config("workers must be at least 1".into()));
        }
        Ok(())
    }

    /// Load from an explicit path. Supports TOML or JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading etl config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing etl config {}", path.display()))?;
        Ok(cfg)
    }

    /// Resolve with env var + fallbacks, then apply env overrides and validate:
    /// 1) $ETL_CONFIG_PATH
    /// 2) config/etl.toml
    /// 3) config/etl.json
    /// 4) defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(PipelineError::Config(format!(
                        "{ENV_CONFIG_PATH} points to non-existent path {}",
                        pb.display()
                    )));
                }
                Self::load_from(&pb)?
            }
            Err(_) => {
                let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
                let json_p = PathBuf::from(DEFAULT_JSON_PATH);
                if toml_p.exists() {
                    Self::load_from(&toml_p)?
                } else if json_p.exists() {
                    Self::load_from(&json_p)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// `$ETL_MIN_RELEVANCE`, clamped to [0,1]; unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_threshold_env(std::env::var(ENV_MIN_RELEVANCE).ok().as_deref()) {
            self.min_relevance_score = t;
        }
    }
}

fn parse_threshold_env(raw: Option<&str>) -> Option<f32> {
    let v = raw?.trim().parse::<f32>().ok()?;
    if !v.is_finite() {
        tracing::warn!(value = v, "ignoring non-finite {}", ENV_MIN_RELEVANCE);
        return None;
    }
    Some(v.clamp(0.0, 1.0))
}

fn parse_config(s: &str, hint_ext: &str) -> anyhow::Result<EtlConfig> {
    let trimmed = s.trim_start();
    let looks_json = trimmed.starts_with('{');
    match hint_ext {
        "toml" => return toml::from_str(s).map_err(Into::into),
        "json" => return serde_json::from_str(s).map_err(Into::into),
        _ => {}
    }
    if looks_json {
        if let Ok(v) = serde_json::from_str(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = toml::from_str(s) {
        return Ok(v);
    }
    Err(anyhow!("unsupported etl config format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EtlConfig::default();
        assert!(cfg.enable_extraction && cfg.enable_validation && cfg.enable_enrichment);
        assert!(cfg.enable_dedup && cfg.enable_fallback);
        assert_eq!(cfg.min_relevance_score, 0.6);
        assert_eq!(cfg.min_description_length, 50);
        assert_eq!(cfg.workers, 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let toml_cfg = parse_config("enable_dedup = false\nworkers = 4\n", "toml").unwrap();
        assert!(!toml_cfg.enable_dedup);
        assert_eq!(toml_cfg.workers, 4);
        assert_eq!(toml_cfg.min_relevance_score, 0.6);

        let json_cfg = parse_config(r#"{"min_relevance_score": 0.25}"#, "").unwrap();
        assert_eq!(json_cfg.min_relevance_score, 0.25);
        assert!(json_cfg.enable_extraction);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_config("enable_magic = true", "toml").is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = EtlConfig {
            min_relevance_score: 1.5,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));
        cfg.min_relevance_score = f32::NAN;
        assert!(cfg.validate().is_err());
        cfg.min_relevance_score = 0.5;
        cfg.workers = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn threshold_env_is_clamped() {
        assert_eq!(parse_threshold_env(Some("0.3")), Some(0.3));
        assert_eq!(parse_threshold_env(Some("7")), Some(1.0));
        assert_eq!(parse_threshold_env(Some("-1")), Some(0.0));
        assert_eq!(parse_threshold_env(Some("high")), None);
        assert_eq!(parse_threshold_env(None), None);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_MIN_RELEVANCE);

        // No files in the temp cwd: defaults.
        assert_eq!(EtlConfig::load_default().unwrap(), EtlConfig::default());

        // config/etl.toml is picked up.
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join(DEFAULT_TOML_PATH), "workers = 3\n").unwrap();
        assert_eq!(EtlConfig::load_default().unwrap().workers, 3);

        // The env path wins over the fallback file.
        let p_json = tmp.path().join("etl.json");
        fs::write(&p_json, r#"{"workers": 5}"#).unwrap();
        env::set_var(ENV_CONFIG_PATH, p_json.display().to_string());
        assert_eq!(EtlConfig::load_default().unwrap().workers, 5);

        // Threshold override.
        env::set_var(ENV_MIN_RELEVANCE, "0.1");
        assert_eq!(EtlConfig::load_default().unwrap().min_relevance_score, 0.1);

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(EtlConfig::load_default().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_MIN_RELEVANCE);
        env::set_current_dir(&old).unwrap();
    }
}
