//! Push and pull of version directories.
//!
//! Every public operation opens its own session through the [`Connector`] and
//! drops it before returning, on success and on error alike. A missing remote
//! project or version is a soft outcome ([`RemoteOutcome::NotFound`]);
//! connection and authentication failures are errors.

use super::session::SftpConnector;
use super::{remote_join, Connector, RemoteFs};
use crate::catalog::{is_version_id, parse_version_id, VersionCatalog};
use crate::config::RemoteProfile;
use crate::transfer::progress::{format_speed, DownloadProgress, ManifestEntry, TransferProgress};
use crate::utils::{Result, VersionerError};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Totals for a finished transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub files: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Completed(TransferSummary),
    /// The remote project or version does not exist
    NotFound,
}

pub struct RemoteSyncClient {
    connector: Box<dyn Connector>,
    base_path: String,
}

impl RemoteSyncClient {
    /// Client for the SFTP server described by `profile`.
    pub fn new(profile: &RemoteProfile) -> Self {
        Self::with_connector(
            Box::new(SftpConnector::new(profile.clone())),
            profile.remote_path.clone(),
        )
    }

    pub fn with_connector(connector: Box<dyn Connector>, base_path: impl Into<String>) -> Self {
        Self {
            connector,
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    fn project_path(&self, project: &str) -> String {
        remote_join(&self.base_path, project)
    }

    /// Connect, make sure the base path exists, disconnect.
    ///
    /// Returns `true` when the base path had to be created.
    pub fn test_connection(&self) -> Result<bool> {
        let session = self.connector.connect()?;

        if session.stat(&self.base_path)?.is_some() {
            debug!(path = %self.base_path, "Remote base path present");
            return Ok(false);
        }

        session.mkdir_all(&self.base_path)?;
        info!(path = %self.base_path, "Created remote base path");
        Ok(true)
    }

    /// Upload the whole local store into `<base>/<project>`.
    pub fn upload_all(&self, local_versions_dir: &Path, project: &str) -> Result<TransferSummary> {
        if !local_versions_dir.is_dir() {
            return Err(VersionerError::Config(format!(
                "No version store at {}",
                local_versions_dir.display()
            )));
        }

        let session = self.connector.connect()?;
        let remote_project = self.project_path(project);
        session.mkdir_all(&remote_project)?;

        let mut summary = TransferSummary::default();
        upload_dir(session.as_ref(), local_versions_dir, &remote_project, &mut summary)?;

        info!(
            project = %project,
            files = summary.files,
            bytes = summary.bytes,
            "Uploaded versions"
        );
        Ok(summary)
    }

    /// Download `<base>/<project>` into the local store.
    pub fn download_all(&self, local_versions_dir: &Path, project: &str) -> Result<RemoteOutcome> {
        let session = self.connector.connect()?;
        let remote_project = self.project_path(project);

        if !is_remote_dir(session.as_ref(), &remote_project)? {
            warn!(project = %project, "No versions of this project on the remote server");
            return Ok(RemoteOutcome::NotFound);
        }

        let mut summary = TransferSummary::default();
        download_dir(session.as_ref(), &remote_project, local_versions_dir, &mut summary, &mut |_: &str| {})?;

        info!(
            project = %project,
            files = summary.files,
            bytes = summary.bytes,
            "Downloaded versions"
        );
        Ok(RemoteOutcome::Completed(summary))
    }

    /// Version ids stored remotely for `project`, newest first.
    pub fn list_remote_versions(&self, project: &str) -> Result<Vec<String>> {
        let session = self.connector.connect()?;
        let remote_project = self.project_path(project);

        if !is_remote_dir(session.as_ref(), &remote_project)? {
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = session
            .list(&remote_project)?
            .into_iter()
            .filter(|e| e.is_dir && is_version_id(&e.name))
            .map(|e| e.name)
            .collect();

        // Newest first across both kinds; the id itself breaks ties
        ids.sort_unstable_by(|a, b| id_timestamp(b).cmp(id_timestamp(a)).then_with(|| b.cmp(a)));
        Ok(ids)
    }

    /// Download one version into `<local_versions_dir>/<version_id>`.
    ///
    /// The remote file manifest is built before the transfer so progress can
    /// be reported in bytes; `on_progress` is called after each file.
    pub fn download_single(
        &self,
        local_versions_dir: &Path,
        project: &str,
        version_id: &str,
        on_progress: &mut dyn FnMut(&TransferProgress),
    ) -> Result<RemoteOutcome> {
        if !is_version_id(version_id) {
            return Err(VersionerError::Config(format!("Invalid version id: {version_id}")));
        }

        let session = self.connector.connect()?;
        let remote_version = remote_join(&self.project_path(project), version_id);

        if !is_remote_dir(session.as_ref(), &remote_version)? {
            warn!(version_id = %version_id, "Version not found on the remote server");
            return Ok(RemoteOutcome::NotFound);
        }

        let mut manifest = Vec::new();
        build_manifest(session.as_ref(), &remote_version, "", &mut manifest)?;
        debug!(version_id = %version_id, files = manifest.len(), "Built remote manifest");

        let mut tracker = DownloadProgress::new(manifest);
        let mut summary = TransferSummary::default();
        let local_version = local_versions_dir.join(version_id);

        download_dir(
            session.as_ref(),
            &remote_version,
            &local_version,
            &mut summary,
            &mut |name: &str| on_progress(tracker.file_completed(name)),
        )?;

        info!(
            version_id = %version_id,
            files = summary.files,
            bytes = summary.bytes,
            elapsed_ms = tracker.elapsed().as_millis() as u64,
            speed = %format_speed(tracker.average_speed()),
            "Downloaded version"
        );
        Ok(RemoteOutcome::Completed(summary))
    }

    /// Download one version into the catalog's store and catalogue it.
    ///
    /// A catalog failure after a successful download is logged, not returned.
    pub fn download_into_catalog(
        &self,
        catalog: &VersionCatalog,
        project: &str,
        version_id: &str,
        on_progress: &mut dyn FnMut(&TransferProgress),
    ) -> Result<RemoteOutcome> {
        let outcome = self.download_single(catalog.versions_dir(), project, version_id, on_progress)?;

        if let RemoteOutcome::Completed(_) = outcome {
            if let Err(e) = catalog.register_downloaded(version_id) {
                warn!(version_id = %version_id, error = %e, "Downloaded version could not be catalogued");
            }
        }

        Ok(outcome)
    }
}

/// Timestamp part of an id. Zero-padded, so it orders lexically by time.
fn id_timestamp(id: &str) -> &str {
    parse_version_id(id).map(|(_, timestamp)| timestamp).unwrap_or_default()
}

fn is_remote_dir(session: &dyn RemoteFs, path: &str) -> Result<bool> {
    Ok(session.stat(path)?.map(|e| e.is_dir).unwrap_or(false))
}

fn upload_dir(
    session: &dyn RemoteFs,
    local: &Path,
    remote: &str,
    summary: &mut TransferSummary,
) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(local)
        .map_err(|e| VersionerError::fs("read", local, e))?
        .collect::<std::io::Result<_>>()
        .map_err(|e| VersionerError::fs("read", local, e))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        let path = entry.path();
        let target = remote_join(remote, &name);

        if path.is_dir() {
            session.mkdir_all(&target)?;
            upload_dir(session, &path, &target, summary)?;
        } else if path.is_file() {
            summary.bytes += session.upload_file(&path, &target)?;
            summary.files += 1;
        }
    }

    Ok(())
}

fn download_dir(
    session: &dyn RemoteFs,
    remote: &str,
    local: &Path,
    summary: &mut TransferSummary,
    on_file: &mut dyn FnMut(&str),
) -> Result<()> {
    fs::create_dir_all(local).map_err(|e| VersionerError::fs("create directory", local, e))?;

    for entry in session.list(remote)? {
        let source = remote_join(remote, &entry.name);
        let target = local.join(&entry.name);

        if entry.is_dir {
            download_dir(session, &source, &target, summary, on_file)?;
        } else {
            summary.bytes += session.download_file(&source, &target)?;
            summary.files += 1;
            on_file(&entry.name);
        }
    }

    Ok(())
}

fn build_manifest(
    session: &dyn RemoteFs,
    remote: &str,
    prefix: &str,
    manifest: &mut Vec<ManifestEntry>,
) -> Result<()> {
    for entry in session.list(remote)? {
        let relative = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };

        if entry.is_dir {
            build_manifest(session, &remote_join(remote, &entry.name), &relative, manifest)?;
        } else {
            manifest.push(ManifestEntry::new(relative, entry.size));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteEntry;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Remote file system backed by a local directory
    struct LocalRemote {
        root: PathBuf,
        open_sessions: Arc<AtomicUsize>,
    }

    impl LocalRemote {
        fn local(&self, remote: &str) -> PathBuf {
            self.root.join(remote.trim_start_matches('/'))
        }
    }

    impl Drop for LocalRemote {
        fn drop(&mut self) {
            self.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl RemoteFs for LocalRemote {
        fn stat(&self, path: &str) -> Result<Option<RemoteEntry>> {
            let local = self.local(path);
            Ok(fs::metadata(&local).ok().map(|m| RemoteEntry {
                name: path.rsplit('/').next().unwrap_or(path).to_string(),
                is_dir: m.is_dir(),
                size: m.len(),
            }))
        }

        fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
            let local = self.local(path);
            let mut entries = Vec::new();
            for entry in fs::read_dir(&local)? {
                let entry = entry?;
                let meta = entry.metadata()?;
                entries.push(RemoteEntry {
                    name: entry.file_name().to_string_lossy().to_string(),
                    is_dir: meta.is_dir(),
                    size: meta.len(),
                });
            }
            Ok(entries)
        }

        fn mkdir_all(&self, path: &str) -> Result<()> {
            fs::create_dir_all(self.local(path))?;
            Ok(())
        }

        fn upload_file(&self, local: &Path, remote: &str) -> Result<u64> {
            Ok(fs::copy(local, self.local(remote))?)
        }

        fn download_file(&self, remote: &str, local: &Path) -> Result<u64> {
            Ok(fs::copy(self.local(remote), local)?)
        }
    }

    struct LocalConnector {
        root: PathBuf,
        open_sessions: Arc<AtomicUsize>,
    }

    impl Connector for LocalConnector {
        fn connect(&self) -> Result<Box<dyn RemoteFs>> {
            self.open_sessions.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(LocalRemote {
                root: self.root.clone(),
                open_sessions: self.open_sessions.clone(),
            }))
        }
    }

    struct UnreachableConnector;

    impl Connector for UnreachableConnector {
        fn connect(&self) -> Result<Box<dyn RemoteFs>> {
            Err(VersionerError::Connection("Cannot connect to backup.invalid:22".into()))
        }
    }

    struct Fixture {
        server: TempDir,
        local: TempDir,
        open_sessions: Arc<AtomicUsize>,
        client: RemoteSyncClient,
    }

    impl Fixture {
        fn new() -> Self {
            let server = TempDir::new().unwrap();
            let local = TempDir::new().unwrap();
            let open_sessions = Arc::new(AtomicUsize::new(0));
            let client = RemoteSyncClient::with_connector(
                Box::new(LocalConnector {
                    root: server.path().to_path_buf(),
                    open_sessions: open_sessions.clone(),
                }),
                "/srv/versions",
            );
            Self {
                server,
                local,
                open_sessions,
                client,
            }
        }

        fn remote(&self, path: &str) -> PathBuf {
            self.server.path().join("srv/versions").join(path)
        }

        fn store(&self) -> PathBuf {
            self.local.path().join(".local-versions")
        }

        fn assert_no_open_sessions(&self) {
            assert_eq!(self.open_sessions.load(Ordering::SeqCst), 0);
        }
    }

    fn write(path: PathBuf, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_list_remote_versions_newest_first() -> Result<()> {
        let fx = Fixture::new();
        for dir in ["v_full_2024-01-01T00-00-00", "v_full_2024-02-01T00-00-00", "notes"] {
            fs::create_dir_all(fx.remote("demo").join(dir))?;
        }
        write(fx.remote("demo/v_stray_file"), b"not a directory");

        let ids = fx.client.list_remote_versions("demo")?;

        assert_eq!(ids, vec!["v_full_2024-02-01T00-00-00", "v_full_2024-01-01T00-00-00"]);
        fx.assert_no_open_sessions();
        Ok(())
    }

    #[test]
    fn test_list_remote_versions_orders_by_timestamp_across_kinds() -> Result<()> {
        let fx = Fixture::new();
        for dir in [
            "v_partial_2020-01-01T00-00-00-000",
            "v_full_2025-06-01T00-00-00-000",
            "v_partial_2025-06-01T00-00-00-000",
            "v_full_2024-01-01T00-00-00-000Z",
        ] {
            fs::create_dir_all(fx.remote("demo").join(dir))?;
        }

        let ids = fx.client.list_remote_versions("demo")?;

        // The Z-suffixed id cannot be downloaded, so it is not listed
        assert_eq!(
            ids,
            vec![
                "v_partial_2025-06-01T00-00-00-000",
                "v_full_2025-06-01T00-00-00-000",
                "v_partial_2020-01-01T00-00-00-000",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_list_missing_project_is_empty() -> Result<()> {
        let fx = Fixture::new();
        assert!(fx.client.list_remote_versions("unknown")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_upload_all_then_download_all() -> Result<()> {
        let fx = Fixture::new();
        write(fx.store().join("versions.json"), b"[]");
        write(fx.store().join("v_full_2024-01-01T00-00-00-000/src/main.rs"), b"fn main() {}");

        let uploaded = fx.client.upload_all(&fx.store(), "demo")?;
        assert_eq!(uploaded, TransferSummary { files: 2, bytes: 14 });
        assert_eq!(
            fs::read(fx.remote("demo/v_full_2024-01-01T00-00-00-000/src/main.rs"))?,
            b"fn main() {}"
        );

        // Uploading again over the existing remote tree is fine
        fx.client.upload_all(&fx.store(), "demo")?;

        let elsewhere = TempDir::new()?;
        let target = elsewhere.path().join("fresh-store");
        let outcome = fx.client.download_all(&target, "demo")?;

        assert_eq!(outcome, RemoteOutcome::Completed(TransferSummary { files: 2, bytes: 14 }));
        assert!(target.join("v_full_2024-01-01T00-00-00-000/src/main.rs").exists());
        fx.assert_no_open_sessions();

        Ok(())
    }

    #[test]
    fn test_download_all_missing_project() -> Result<()> {
        let fx = Fixture::new();
        assert_eq!(fx.client.download_all(&fx.store(), "ghost")?, RemoteOutcome::NotFound);
        assert!(!fx.store().exists());
        fx.assert_no_open_sessions();
        Ok(())
    }

    #[test]
    fn test_download_single_reports_byte_progress() -> Result<()> {
        let fx = Fixture::new();
        let id = "v_partial_2024-03-01T10-00-00-000";
        write(fx.remote(&format!("demo/{id}/src/lib.rs")), &[b'a'; 300]);
        write(fx.remote(&format!("demo/{id}/src/util/mod.rs")), &[b'b'; 100]);
        write(fx.remote(&format!("demo/{id}/docs/readme.md")), &[b'c'; 600]);
        write(fx.remote("demo/v_full_2024-01-01T00-00-00-000/other.txt"), b"x");

        let mut seen = Vec::new();
        let outcome = fx.client.download_single(&fx.store(), "demo", id, &mut |p: &TransferProgress| {
            seen.push((p.transferred_bytes, p.total_bytes));
        })?;

        assert_eq!(outcome, RemoteOutcome::Completed(TransferSummary { files: 3, bytes: 1000 }));
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|(_, total)| *total == 1000));
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(seen.last().map(|(t, _)| *t), Some(1000));

        assert!(fx.store().join(id).join("src/util/mod.rs").exists());
        assert!(!fx.store().join("v_full_2024-01-01T00-00-00-000").exists());
        fx.assert_no_open_sessions();

        Ok(())
    }

    #[test]
    fn test_download_single_missing_version() -> Result<()> {
        let fx = Fixture::new();
        fs::create_dir_all(fx.remote("demo"))?;

        let outcome = fx.client.download_single(
            &fx.store(),
            "demo",
            "v_full_2024-01-01T00-00-00-000",
            &mut |_: &TransferProgress| {},
        )?;

        assert_eq!(outcome, RemoteOutcome::NotFound);
        fx.assert_no_open_sessions();
        Ok(())
    }

    #[test]
    fn test_download_single_rejects_invalid_ids() {
        let fx = Fixture::new();
        let result = fx.client.download_single(&fx.store(), "demo", "../../etc", &mut |_: &TransferProgress| {});
        assert!(matches!(result, Err(VersionerError::Config(_))));
    }

    #[test]
    fn test_download_into_catalog_registers_record() -> Result<()> {
        let fx = Fixture::new();
        let id = "v_full_2024-03-01T10-00-00-000";
        write(fx.remote(&format!("demo/{id}/main.rs")), b"fn main() {}");

        let catalog = VersionCatalog::new(fx.store());
        let outcome = fx.client.download_into_catalog(&catalog, "demo", id, &mut |_: &TransferProgress| {})?;

        assert!(matches!(outcome, RemoteOutcome::Completed(_)));
        let record = catalog.find(id).expect("catalogued");
        assert_eq!(record.size_bytes, 12);
        assert_eq!(record.description, "Downloaded from remote server");

        Ok(())
    }

    #[test]
    fn test_test_connection_creates_base_path() -> Result<()> {
        let fx = Fixture::new();

        assert!(fx.client.test_connection()?);
        assert!(fx.server.path().join("srv/versions").is_dir());
        assert!(!fx.client.test_connection()?);
        fx.assert_no_open_sessions();

        Ok(())
    }

    #[test]
    fn test_connection_failure_is_an_error() {
        let client = RemoteSyncClient::with_connector(Box::new(UnreachableConnector), "/srv");

        let err = client.list_remote_versions("demo").unwrap_err();
        assert!(err.is_connection_failure());

        let temp_dir = TempDir::new().unwrap();
        let err = client.download_all(temp_dir.path(), "demo").unwrap_err();
        assert!(err.is_connection_failure());
    }
}
