use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub azure: AzureConfig,
    pub retention: RetentionConfig,
    pub run: RunConfig,
    pub log: LogConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Storage account key (SharedKey).
    Key,
    /// Entra ID token from the Azure CLI session.
    Entra,
}

impl FromStr for AuthMethod {
    type Err = String;

    /// Accepts the menu numbers too: 1 = key, 2 = entra.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "key" => Ok(Self::Key),
            "2" | "entra" => Ok(Self::Entra),
            _ => Err("Invalid input. Please enter '1' or '2'.".to_string()),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key => f.write_str("Account Key"),
            Self::Entra => f.write_str("Entra ID"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub account: Option<String>,
    pub auth: Option<AuthMethod>,
    pub endpoint_suffix: String,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self { account: None, auth: None, endpoint_suffix: DEFAULT_ENDPOINT_SUFFIX.to_string() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub share: Option<String>,
    /// Signed so a bad file value reaches validation instead of failing the parse.
    pub days: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Concurrent lease breaks; 1 keeps the run strictly sequential.
    pub parallel: usize,
    pub isolate_fetch_errors: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { parallel: 1, isolate_fetch_errors: false }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: String,
    pub max_bytes: u64,
    pub backups: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { dir: "~/snapshot-lease-breaker".to_string(), max_bytes: 2_000_000, backups: 5 }
    }
}

impl LogConfig {
    pub fn dir_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.dir).to_string())
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        PathBuf::from(shellexpand::tilde("~/.config/slb/slb.toml").to_string())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    /// An explicit path must exist; the default path is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(anyhow!("config file {} does not exist", path.display()));
                }
                Self::load_from(path)
            }
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("slb.toml");
        let mut cfg = Config::default();
        cfg.azure.account = Some("acct01".into());
        cfg.azure.auth = Some(AuthMethod::Entra);
        cfg.retention.days = Some(30);
        cfg.run.parallel = 4;
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slb.toml");
        std::fs::write(&path, "[retention]\nshare = \"data\"\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.retention.share.as_deref(), Some("data"));
        assert_eq!(cfg.azure.endpoint_suffix, DEFAULT_ENDPOINT_SUFFIX);
        assert_eq!(cfg.run.parallel, 1);
        assert_eq!(cfg.log.max_bytes, 2_000_000);
        assert_eq!(cfg.log.backups, 5);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn auth_method_parsing() {
        assert_eq!("1".parse::<AuthMethod>(), Ok(AuthMethod::Key));
        assert_eq!("Entra".parse::<AuthMethod>(), Ok(AuthMethod::Entra));
        assert!("3".parse::<AuthMethod>().is_err());
    }

    #[test]
    fn log_dir_expands_tilde() {
        let p = LogConfig::default().dir_path();
        assert!(!p.to_string_lossy().starts_with('~'));
        assert!(p.ends_with("snapshot-lease-breaker"));
    }
}
