use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::services::queue::QueuePolicy;

/// Which archive client variant to construct for workflow runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveClientKind {
    /// Retrieve archives from the tape-backed store with the real tool.
    #[default]
    Remote,
    /// Look for pre-staged archives on local disk; for environments
    /// where the retrieval tool cannot be installed.
    Fixture,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Redis connection string for the job queue
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Template for the archive source root; `{host}` is replaced with
    /// the host the archive was uploaded from
    pub source_root_template: String,

    /// Local root under which archives are downloaded for verification
    pub verify_root_dir: PathBuf,

    /// Directory the retrieval tool writes its own logs to (DSM_LOG)
    pub retrieval_log_dir: PathBuf,

    /// Warning codes that do not fail a retrieval (comma-separated)
    #[serde(default)]
    pub whitelisted_warnings: Vec<String>,

    /// Per-job execution timeout in seconds
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// How long a finished job's result stays readable, in seconds
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,

    /// How long job metadata lives before expiring, in seconds
    #[serde(default = "default_job_ttl_secs")]
    pub job_ttl_secs: u64,

    /// Archive client variant: "remote" or "fixture"
    #[serde(default)]
    pub archive_client: ArchiveClientKind,

    /// Extra retrieval-tool flags, comma-separated `key=value` or bare
    /// `key` entries; same-named keys override the built-in defaults
    #[serde(default)]
    pub retrieval_extra_args: Option<String>,

    /// Externally reachable base URL used to build status links
    pub base_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_job_timeout_secs() -> u64 {
    43_200 // tape retrievals can take hours
}

fn default_result_ttl_secs() -> u64 {
    604_800
}

fn default_job_ttl_secs() -> u64 {
    604_800
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Extra retrieval-tool flags in key/value form. A `key=value` entry
    /// carries a value, a bare `key` entry does not.
    pub fn extra_retrieval_args(&self) -> BTreeMap<String, Option<String>> {
        let mut args = BTreeMap::new();
        let Some(raw) = &self.retrieval_extra_args else {
            return args;
        };
        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            match entry.split_once('=') {
                Some((key, value)) => {
                    args.insert(key.trim().to_string(), Some(value.trim().to_string()))
                }
                None => args.insert(entry.to_string(), None),
            };
        }
        args
    }

    /// Retention knobs handed to the queue collaborator at enqueue time.
    pub fn queue_policy(&self) -> QueuePolicy {
        QueuePolicy {
            job_timeout_secs: self.job_timeout_secs,
            result_ttl_secs: self.result_ttl_secs,
            job_ttl_secs: self.job_ttl_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_extras(raw: Option<&str>) -> AppConfig {
        AppConfig {
            bind_addr: default_bind_addr(),
            redis_url: default_redis_url(),
            source_root_template: "/archives/{host}".to_string(),
            verify_root_dir: PathBuf::from("/tmp/verify"),
            retrieval_log_dir: PathBuf::from("/tmp/logs"),
            whitelisted_warnings: vec![],
            job_timeout_secs: default_job_timeout_secs(),
            result_ttl_secs: default_result_ttl_secs(),
            job_ttl_secs: default_job_ttl_secs(),
            archive_client: ArchiveClientKind::Remote,
            retrieval_extra_args: raw.map(|s| s.to_string()),
            base_url: "http://localhost:3000".to_string(),
        }
    }

    #[test]
    fn extra_args_absent() {
        assert!(config_with_extras(None).extra_retrieval_args().is_empty());
    }

    #[test]
    fn extra_args_key_value_and_bare() {
        let args = config_with_extras(Some("followsymbolic=yes, quiet")).extra_retrieval_args();
        assert_eq!(
            args.get("followsymbolic"),
            Some(&Some("yes".to_string()))
        );
        assert_eq!(args.get("quiet"), Some(&None));
    }

    #[test]
    fn extra_args_empty_entries_skipped() {
        let args = config_with_extras(Some("a=1,,b")).extra_retrieval_args();
        assert_eq!(args.len(), 2);
    }
}
