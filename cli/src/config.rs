use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const DB_ENV: &str = "FITLOG_DB";
pub const PROFILE_ENV: &str = "FITLOG_PROFILE";
const DEFAULT_PROFILE_ID: i64 = 1;

pub struct Config {
    pub db_path: PathBuf,
    pub profile_id: i64,
}

/// Values that override the defaults, from the environment or the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub profile_id: Option<i64>,
}

impl Overrides {
    pub fn from_env() -> Result<Self> {
        let db_path = std::env::var_os(DB_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let profile_id = match std::env::var(PROFILE_ENV) {
            Ok(v) if !v.trim().is_empty() => Some(parse_profile_id(&v)?),
            _ => None,
        };
        Ok(Overrides {
            db_path,
            profile_id,
        })
    }

    /// Values set in `other` win.
    #[must_use]
    pub fn merge(self, other: Overrides) -> Self {
        Overrides {
            db_path: other.db_path.or(self.db_path),
            profile_id: other.profile_id.or(self.profile_id),
        }
    }
}

impl Config {
    /// Resolve the configuration: command-line flags, then `FITLOG_DB` /
    /// `FITLOG_PROFILE`, then the platform data directory and profile 1.
    pub fn load(flags: Overrides) -> Result<Self> {
        let overrides = Overrides::from_env()?.merge(flags);
        if overrides.db_path.is_some() {
            return Self::resolve(None, overrides);
        }

        let proj_dirs =
            ProjectDirs::from("", "", "fitlog").context("Could not determine home directory")?;
        Self::resolve(Some(proj_dirs.data_dir()), overrides)
    }

    pub fn resolve(data_dir: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let db_path = match (overrides.db_path, data_dir) {
            (Some(path), _) => path,
            (None, Some(dir)) => dir.join("fitlog.db"),
            (None, None) => bail!("No database path configured"),
        };

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }

        Ok(Config {
            db_path,
            profile_id: overrides.profile_id.unwrap_or(DEFAULT_PROFILE_ID),
        })
    }
}

fn parse_profile_id(raw: &str) -> Result<i64> {
    let id: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid {PROFILE_ENV} value '{raw}'"))?;
    if id < 1 {
        bail!("Invalid {PROFILE_ENV} value '{raw}': profile ids start at 1");
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_to_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("fitlog");
        let config = Config::resolve(Some(&data_dir), Overrides::default()).unwrap();
        assert_eq!(config.db_path, data_dir.join("fitlog.db"));
        assert_eq!(config.profile_id, 1);
        assert!(data_dir.is_dir());
    }

    #[test]
    fn test_resolve_explicit_db_path() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("logs.db");
        let config = Config::resolve(
            None,
            Overrides {
                db_path: Some(db_path.clone()),
                profile_id: Some(3),
            },
        )
        .unwrap();
        assert_eq!(config.db_path, db_path);
        assert_eq!(config.profile_id, 3);
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_resolve_without_any_path_fails() {
        assert!(Config::resolve(None, Overrides::default()).is_err());
    }

    #[test]
    fn test_merge_prefers_later_values() {
        let env = Overrides {
            db_path: Some(PathBuf::from("env.db")),
            profile_id: Some(2),
        };
        let flags = Overrides {
            db_path: None,
            profile_id: Some(5),
        };
        let merged = env.merge(flags);
        assert_eq!(merged.db_path, Some(PathBuf::from("env.db")));
        assert_eq!(merged.profile_id, Some(5));
    }

    #[test]
    fn test_parse_profile_id() {
        assert_eq!(parse_profile_id(" 4 ").unwrap(), 4);
        assert!(parse_profile_id("0").is_err());
        assert!(parse_profile_id("abc").is_err());
    }
}
