use std::path::PathBuf;

use crate::PlanError;
use crate::calendar::MarkerPalette;

pub const DEFAULT_DATA_DIR: &str = "./fitplan-data";

#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
    pub key_prefix: String,
    pub palette: MarkerPalette,
}

impl Config {
    pub fn from_env() -> Result<Self, PlanError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, PlanError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let data_dir = get("FITPLAN_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into());
        if data_dir.trim().is_empty() {
            return Err(PlanError::Config("FITPLAN_DATA_DIR is empty".into()));
        }
        let key_prefix = get("FITPLAN_KEY_PREFIX").unwrap_or_default();

        let mut palette = MarkerPalette::default();
        if let Some(color) = get("FITPLAN_SUCCESS_COLOR").filter(|c| !c.trim().is_empty()) {
            palette.success = color;
        }
        if let Some(color) = get("FITPLAN_PENDING_COLOR").filter(|c| !c.trim().is_empty()) {
            palette.pending = color;
        }

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            key_prefix,
            palette,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{DEFAULT_PENDING_COLOR, DEFAULT_SUCCESS_COLOR};

    #[test]
    fn from_env_defaults() {
        let cfg = Config::from_env_with(|_| None).expect("cfg");
        assert_eq!(cfg.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(cfg.key_prefix, "");
        assert_eq!(cfg.palette.success, DEFAULT_SUCCESS_COLOR);
        assert_eq!(cfg.palette.pending, DEFAULT_PENDING_COLOR);
    }

    #[test]
    fn from_env_reads_values() {
        let get = |k: &str| match k {
            "FITPLAN_DATA_DIR" => Some("/tmp/plan".into()),
            "FITPLAN_KEY_PREFIX" => Some("alice.".into()),
            "FITPLAN_PENDING_COLOR" => Some("orange".into()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/plan"));
        assert_eq!(cfg.key_prefix, "alice.");
        assert_eq!(cfg.palette.pending, "orange");
        assert_eq!(cfg.palette.success, DEFAULT_SUCCESS_COLOR);
    }

    #[test]
    fn from_env_blank_data_dir() {
        let get = |k: &str| match k {
            "FITPLAN_DATA_DIR" => Some("  ".into()),
            _ => None,
        };
        let res = Config::from_env_with(get);
        assert!(matches!(res, Err(PlanError::Config(_))));
    }
}
