//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use archive_verify::config::{AppConfig, ArchiveClientKind};
use archive_verify::services::checksum::MANIFEST_NAME;

/// md5 of "hello\n"
pub const HELLO_MD5: &str = "b1946ac92492d2347c6235b4d2611184";

/// Configuration pointing the fixture client at `verify_root`.
pub fn fixture_config(verify_root: &Path) -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        redis_url: "redis://127.0.0.1:6379".to_string(),
        source_root_template: "/archives/{host}".to_string(),
        verify_root_dir: verify_root.to_path_buf(),
        retrieval_log_dir: verify_root.join("logs"),
        whitelisted_warnings: vec!["ANS2250W".to_string()],
        job_timeout_secs: 60,
        result_ttl_secs: 60,
        job_ttl_secs: 60,
        archive_client: ArchiveClientKind::Fixture,
        retrieval_extra_args: None,
        base_url: "http://localhost:3000".to_string(),
    }
}

/// Stage `<verify_root>/<dir_name>/<archive>/` with one data file and the
/// manifest the checksum tool compares against. The manifest expects the
/// file to contain "hello\n"; pass different content to break the match.
/// Returns the staged destination directory.
pub fn stage_archive(verify_root: &Path, dir_name: &str, archive: &str, content: &str) -> PathBuf {
    let dest = verify_root.join(dir_name);
    let archive_dir = dest.join(archive);
    fs::create_dir_all(&archive_dir).unwrap();
    fs::write(archive_dir.join("data.txt"), content).unwrap();
    fs::write(
        archive_dir.join(MANIFEST_NAME),
        format!("{HELLO_MD5}  data.txt\n"),
    )
    .unwrap();
    dest
}
