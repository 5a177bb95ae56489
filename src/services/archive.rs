//! Archive retrieval clients.
//!
//! Two variants behind one contract: `RemoteClient` drives the real
//! retrieval tool against the tape-backed store, `FixtureClient` serves
//! pre-staged archives from local disk for environments where the tool
//! cannot be installed. The variant is chosen once at construction time
//! from configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use uuid::Uuid;

use crate::config::{AppConfig, ArchiveClientKind};
use crate::services::classifier;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a retrieval attempt. `Failed` means the client ran but the
/// outcome was classified as a failure; the debug payload carries the
/// non-whitelisted codes or the raw tool output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieval {
    Complete,
    Failed { debug: Option<String> },
}

#[derive(Debug)]
pub enum ArchiveClient {
    Remote(RemoteClient),
    Fixture(FixtureClient),
}

impl ArchiveClient {
    pub fn from_config(
        config: &AppConfig,
        archive: &str,
        source_path: &Path,
        description: &str,
        job_id: Uuid,
    ) -> Result<Self, RetrievalError> {
        match config.archive_client {
            ArchiveClientKind::Remote => Ok(Self::Remote(RemoteClient::new(
                config,
                archive,
                source_path,
                description,
                job_id,
            ))),
            ArchiveClientKind::Fixture => Ok(Self::Fixture(FixtureClient::new(
                &config.verify_root_dir,
                archive,
            )?)),
        }
    }

    /// Destination the archive is (or was) downloaded to. Unique per job
    /// for the remote variant.
    pub fn destination(&self) -> PathBuf {
        match self {
            Self::Remote(client) => client.dest(),
            Self::Fixture(client) => client.dest(),
        }
    }

    /// Fetch the archive from the store.
    pub async fn retrieve(&self) -> Result<Retrieval, RetrievalError> {
        match self {
            Self::Remote(client) => client.retrieve().await,
            Self::Fixture(client) => Ok(client.retrieve()),
        }
    }

    /// Root of the retrieved archive tree.
    pub fn downloaded_path(&self) -> PathBuf {
        let archive_name = match self {
            Self::Remote(client) => &client.archive_name,
            Self::Fixture(client) => &client.archive_name,
        };
        self.destination().join(archive_name)
    }

    /// Remove the destination tree.
    pub async fn cleanup(&self) -> std::io::Result<()> {
        tokio::fs::remove_dir_all(self.destination()).await
    }
}

/// Retrieves archives from the tape-backed store via the `dsmc` command
/// line tool.
#[derive(Debug)]
pub struct RemoteClient {
    archive_name: String,
    source_path: PathBuf,
    description: String,
    job_id: Uuid,
    dest_root: PathBuf,
    log_dir: PathBuf,
    whitelist: Vec<String>,
    extra_args: BTreeMap<String, Option<String>>,
}

impl RemoteClient {
    fn new(
        config: &AppConfig,
        archive: &str,
        source_path: &Path,
        description: &str,
        job_id: Uuid,
    ) -> Self {
        Self {
            archive_name: archive.to_string(),
            source_path: source_path.to_path_buf(),
            description: description.to_string(),
            job_id,
            dest_root: config.verify_root_dir.clone(),
            log_dir: config.retrieval_log_dir.clone(),
            whitelist: config.whitelisted_warnings.clone(),
            extra_args: config.extra_retrieval_args(),
        }
    }

    /// The job id suffix keeps concurrent retrievals of the same archive
    /// name from clobbering each other.
    fn dest(&self) -> PathBuf {
        self.dest_root
            .join(format!("{}_{}", self.archive_name, self.job_id))
    }

    /// Key-value flags appended to the retrieval command line. Extra
    /// flags from the configuration override same-named defaults; flags
    /// with no value are emitted bare.
    fn tool_args(&self) -> String {
        let mut key_values: BTreeMap<String, Option<String>> = BTreeMap::from([
            ("subdir".to_string(), Some("yes".to_string())),
            (
                "description".to_string(),
                Some(self.description.clone()),
            ),
        ]);
        key_values.extend(self.extra_args.clone());

        key_values
            .iter()
            .map(|(key, value)| match value {
                Some(value) => format!("-{key}='{value}'"),
                None => format!("-{key}"),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command_line(&self) -> String {
        format!(
            "dsmc retr {}/ {}/ {}",
            self.source_path.display(),
            self.dest().display(),
            self.tool_args()
        )
    }

    async fn retrieve(&self) -> Result<Retrieval, RetrievalError> {
        let cmd = self.command_line();
        tracing::info!(job_id = %self.job_id, command = %cmd, "starting archive retrieval");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&cmd)
            .env("DSM_LOG", &self.log_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        // A tool killed by a signal has no exit code; treat it as a hard
        // failure, never as a warning.
        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code != 0 {
            let classification = classifier::classify(exit_code, &combined, &self.whitelist);
            if classification.accepted {
                tracing::warn!(job_id = %self.job_id, exit_code, "retrieval completed with whitelisted warnings");
                return Ok(Retrieval::Complete);
            }
            return Ok(Retrieval::Failed {
                debug: classification.debug,
            });
        }

        tracing::info!(job_id = %self.job_id, "archive retrieval completed");
        Ok(Retrieval::Complete)
    }
}

/// Offline variant: instead of invoking the retrieval tool, looks under
/// the verify root for a pre-staged archive whose directory name starts
/// with the requested archive name.
#[derive(Debug)]
pub struct FixtureClient {
    verify_root: PathBuf,
    archive_name: String,
    prestaged: Option<PathBuf>,
}

impl FixtureClient {
    fn new(verify_root: &Path, archive: &str) -> Result<Self, RetrievalError> {
        let mut prestaged = None;
        for entry in std::fs::read_dir(verify_root)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(archive) {
                prestaged = Some(entry.path());
            }
        }
        Ok(Self {
            verify_root: verify_root.to_path_buf(),
            archive_name: archive.to_string(),
            prestaged,
        })
    }

    fn dest(&self) -> PathBuf {
        match &self.prestaged {
            Some(path) => path.clone(),
            // No match: a path that cannot exist yet, so cleanup can
            // never target the verify root itself.
            None => self.verify_root.join(&self.archive_name),
        }
    }

    fn retrieve(&self) -> Retrieval {
        match &self.prestaged {
            Some(path) => {
                tracing::info!(path = %path.display(), "found pre-staged archive");
                Retrieval::Complete
            }
            None => Retrieval::Failed {
                debug: Some(format!(
                    "no pre-staged archive matching '{}' under {}",
                    self.archive_name,
                    self.verify_root.display()
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArchiveClientKind;

    fn remote_config(extra: Option<&str>) -> AppConfig {
        AppConfig {
            bind_addr: "0.0.0.0:3000".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            source_root_template: "/archives/{host}".to_string(),
            verify_root_dir: PathBuf::from("/data/verify"),
            retrieval_log_dir: PathBuf::from("/data/logs"),
            whitelisted_warnings: vec!["ANS2250W".to_string()],
            job_timeout_secs: 60,
            result_ttl_secs: 60,
            job_ttl_secs: 60,
            archive_client: ArchiveClientKind::Remote,
            retrieval_extra_args: extra.map(|s| s.to_string()),
            base_url: "http://localhost:3000".to_string(),
        }
    }

    fn remote(config: &AppConfig, job_id: Uuid) -> RemoteClient {
        RemoteClient::new(
            config,
            "my_archive",
            Path::new("/archives/host1/my_archive"),
            "descr-1",
            job_id,
        )
    }

    #[test]
    fn destinations_are_unique_per_job() {
        let config = remote_config(None);
        let a = remote(&config, Uuid::new_v4());
        let b = remote(&config, Uuid::new_v4());

        assert_ne!(a.dest(), b.dest());
        assert!(a.dest().to_string_lossy().contains(&a.job_id.to_string()));
        assert!(b.dest().to_string_lossy().contains(&b.job_id.to_string()));
    }

    #[test]
    fn tool_args_carry_defaults() {
        let config = remote_config(None);
        let client = remote(&config, Uuid::new_v4());
        let args = client.tool_args();
        assert!(args.contains("-subdir='yes'"));
        assert!(args.contains("-description='descr-1'"));
    }

    #[test]
    fn extra_args_override_defaults_and_bare_flags_have_no_value() {
        let config = remote_config(Some("subdir=no,quiet"));
        let client = remote(&config, Uuid::new_v4());
        let args = client.tool_args();
        assert!(args.contains("-subdir='no'"));
        assert!(!args.contains("-subdir='yes'"));
        assert!(args.split_whitespace().any(|a| a == "-quiet"));
    }

    #[test]
    fn command_line_has_source_dest_and_flags() {
        let config = remote_config(None);
        let client = remote(&config, Uuid::new_v4());
        let cmd = client.command_line();
        assert!(cmd.starts_with("dsmc retr /archives/host1/my_archive/ "));
        assert!(cmd.contains("/data/verify/my_archive_"));
        assert!(cmd.contains("-description='descr-1'"));
    }

    #[test]
    fn fixture_matches_archive_name_as_prefix() {
        let root = tempfile::tempdir().unwrap();
        let staged = root.path().join("my_archive_20240101");
        std::fs::create_dir_all(&staged).unwrap();

        let client = FixtureClient::new(root.path(), "my_archive").unwrap();
        assert_eq!(client.retrieve(), Retrieval::Complete);
        assert_eq!(client.dest(), staged);
    }

    #[test]
    fn fixture_without_match_fails() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("unrelated")).unwrap();

        let client = FixtureClient::new(root.path(), "my_archive").unwrap();
        match client.retrieve() {
            Retrieval::Failed { debug } => {
                assert!(debug.unwrap().contains("my_archive"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_ne!(client.dest(), root.path());
    }

    #[test]
    fn downloaded_path_is_under_the_destination() {
        let root = tempfile::tempdir().unwrap();
        let staged = root.path().join("my_archive_1");
        std::fs::create_dir_all(&staged).unwrap();

        let mut config = remote_config(None);
        config.archive_client = ArchiveClientKind::Fixture;
        config.verify_root_dir = root.path().to_path_buf();

        let client = ArchiveClient::from_config(
            &config,
            "my_archive",
            Path::new("/unused"),
            "descr",
            Uuid::new_v4(),
        )
        .unwrap();
        assert_eq!(client.downloaded_path(), staged.join("my_archive"));
    }
}
