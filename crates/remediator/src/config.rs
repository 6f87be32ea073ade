use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

pub const DEFAULT_ADDR: &str = "0.0.0.0:5001";
pub const DEFAULT_PROGRAM: &str = "ansible-playbook";
pub const DEFAULT_PLAYBOOK_PATH: &str = "/app/restart.yml";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub remediation: RemediationConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationConfig {
    /// Executable started for every alert.
    pub program: String,
    /// Passed as the first argument to `program`.
    pub playbook_path: PathBuf,
    pub extra_args: Vec<String>,
    /// `None` waits for the command forever.
    pub timeout: Option<Duration>,
    /// Number of remediation runs allowed at once. 0 means unbounded.
    pub max_concurrent: usize,
    /// Answer 500 when the command exits with a non-zero status.
    pub fail_on_nonzero_exit: bool,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            playbook_path: PathBuf::from(DEFAULT_PLAYBOOK_PATH),
            extra_args: Vec::new(),
            timeout: None,
            max_concurrent: 1,
            fail_on_nonzero_exit: false,
        }
    }
}

impl RemediationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(Error::Config("REMEDIATION_PROGRAM must not be empty".to_string()));
        }
        if self.playbook_path.as_os_str().is_empty() {
            return Err(Error::Config("PLAYBOOK_PATH must not be empty".to_string()));
        }
        Ok(())
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RemediationConfig::default();

        let timeout = parse_var::<u64, _>(&lookup, "REMEDIATION_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let config = Config {
            server: ServerConfig {
                addr: lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            },
            remediation: RemediationConfig {
                program: lookup("REMEDIATION_PROGRAM").unwrap_or(defaults.program),
                playbook_path: lookup("PLAYBOOK_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.playbook_path),
                extra_args: lookup("REMEDIATION_EXTRA_ARGS")
                    .map(|args| args.split_whitespace().map(String::from).collect())
                    .unwrap_or_default(),
                timeout,
                max_concurrent: parse_var(&lookup, "REMEDIATION_MAX_CONCURRENT")?
                    .unwrap_or(defaults.max_concurrent),
                fail_on_nonzero_exit: parse_var(&lookup, "FAIL_ON_NONZERO_EXIT")?
                    .unwrap_or(defaults.fail_on_nonzero_exit),
            },
        };

        config.remediation.validate()?;

        if config.remediation.max_concurrent == 0 {
            tracing::warn!("REMEDIATION_MAX_CONCURRENT is 0, remediation runs may overlap");
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .to_lowercase()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid value {:?} for {}: {}", raw, key, e))),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                addr: DEFAULT_ADDR.to_string(),
            },
            remediation: RemediationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_reference_listener() {
        let config = load_from(&[]).unwrap();
        assert_eq!(config.server.addr, "0.0.0.0:5001");
        assert_eq!(config.remediation, RemediationConfig::default());
        assert_eq!(config.remediation.program, "ansible-playbook");
        assert_eq!(config.remediation.playbook_path, PathBuf::from("/app/restart.yml"));
        assert!(config.remediation.timeout.is_none());
        assert_eq!(config.remediation.max_concurrent, 1);
        assert!(!config.remediation.fail_on_nonzero_exit);
    }

    #[test]
    fn reads_overrides() {
        let config = load_from(&[
            ("SERVER_ADDR", "127.0.0.1:9000"),
            ("REMEDIATION_PROGRAM", "/usr/local/bin/ansible-playbook"),
            ("PLAYBOOK_PATH", "/etc/playbooks/nginx.yml"),
            ("REMEDIATION_EXTRA_ARGS", "-i inventory.ini  --limit web"),
            ("REMEDIATION_TIMEOUT_SECS", "120"),
            ("REMEDIATION_MAX_CONCURRENT", "4"),
            ("FAIL_ON_NONZERO_EXIT", "TRUE"),
        ])
        .unwrap();

        assert_eq!(config.server.addr, "127.0.0.1:9000");
        assert_eq!(config.remediation.program, "/usr/local/bin/ansible-playbook");
        assert_eq!(
            config.remediation.playbook_path,
            PathBuf::from("/etc/playbooks/nginx.yml")
        );
        assert_eq!(
            config.remediation.extra_args,
            vec!["-i", "inventory.ini", "--limit", "web"]
        );
        assert_eq!(config.remediation.timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.remediation.max_concurrent, 4);
        assert!(config.remediation.fail_on_nonzero_exit);
    }

    #[test]
    fn zero_timeout_means_none() {
        let config = load_from(&[("REMEDIATION_TIMEOUT_SECS", "0")]).unwrap();
        assert!(config.remediation.timeout.is_none());
    }

    #[test]
    fn rejects_invalid_numbers() {
        let err = load_from(&[("REMEDIATION_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("REMEDIATION_TIMEOUT_SECS")));
    }

    #[test]
    fn rejects_invalid_bool() {
        assert!(load_from(&[("FAIL_ON_NONZERO_EXIT", "maybe")]).is_err());
    }

    #[test]
    fn rejects_empty_program() {
        let err = load_from(&[("REMEDIATION_PROGRAM", "  ")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
