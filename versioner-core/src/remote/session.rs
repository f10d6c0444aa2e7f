//! SFTP sessions on top of `ssh2`.

use super::{Connector, RemoteEntry, RemoteFs};
use crate::config::{Credential, RemoteProfile};
use crate::utils::{Result, VersionerError};
use ssh2::{ErrorCode, Session, Sftp};
use std::fs::File;
use std::io;
use std::net::TcpStream;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// `LIBSSH2_FX_NO_SUCH_FILE`
const SFTP_NO_SUCH_FILE: i32 = 2;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const SESSION_TIMEOUT_MS: u32 = 60_000;

/// Connects with the credentials of a [`RemoteProfile`]
#[derive(Debug, Clone)]
pub struct SftpConnector {
    profile: RemoteProfile,
}

impl SftpConnector {
    pub fn new(profile: RemoteProfile) -> Self {
        Self { profile }
    }
}

impl Connector for SftpConnector {
    fn connect(&self) -> Result<Box<dyn RemoteFs>> {
        Ok(Box::new(SftpSession::open(&self.profile)?))
    }
}

/// An authenticated session with its SFTP channel. Disconnects on drop.
pub struct SftpSession {
    sftp: Sftp,
    session: Session,
}

impl SftpSession {
    pub fn open(profile: &RemoteProfile) -> Result<Self> {
        let address = profile.address();
        debug!(address = %address, "Connecting to remote host");

        let tcp = connect_tcp(&address)?;
        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.set_timeout(SESSION_TIMEOUT_MS);
        session
            .handshake()
            .map_err(|e| VersionerError::Connection(format!("SSH handshake with {address} failed: {e}")))?;

        let auth = match &profile.credential {
            Credential::Password { password } => session.userauth_password(&profile.username, password),
            Credential::PrivateKey {
                private_key,
                passphrase,
            } => session.userauth_pubkey_memory(
                &profile.username,
                None,
                private_key,
                passphrase.as_deref(),
            ),
        };
        auth.map_err(|e| {
            VersionerError::Authentication(format!("{}@{}: {}", profile.username, address, e))
        })?;

        if !session.authenticated() {
            return Err(VersionerError::Authentication(format!(
                "{}@{}: server rejected credentials",
                profile.username, address
            )));
        }

        let sftp = session.sftp()?;
        debug!(address = %address, "SFTP session established");

        Ok(Self { sftp, session })
    }
}

fn connect_tcp(address: &str) -> Result<TcpStream> {
    use std::net::ToSocketAddrs;

    let addrs = address
        .to_socket_addrs()
        .map_err(|e| VersionerError::Connection(format!("Cannot resolve {address}: {e}")))?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }

    Err(VersionerError::Connection(match last_error {
        Some(e) => format!("Cannot connect to {address}: {e}"),
        None => format!("Cannot resolve {address}"),
    }))
}

fn is_missing(e: &ssh2::Error) -> bool {
    matches!(e.code(), ErrorCode::SFTP(SFTP_NO_SUCH_FILE))
}

impl RemoteFs for SftpSession {
    fn stat(&self, path: &str) -> Result<Option<RemoteEntry>> {
        match self.sftp.stat(Path::new(path)) {
            Ok(stat) => Ok(Some(RemoteEntry {
                name: path.rsplit('/').next().unwrap_or(path).to_string(),
                is_dir: stat.is_dir(),
                size: stat.size.unwrap_or(0),
            })),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let entries = self.sftp.readdir(Path::new(path))?;
        Ok(entries
            .into_iter()
            .filter_map(|(entry_path, stat)| {
                let name = entry_path.file_name()?.to_string_lossy().to_string();
                if name == "." || name == ".." {
                    return None;
                }
                Some(RemoteEntry {
                    name,
                    is_dir: stat.is_dir(),
                    size: stat.size.unwrap_or(0),
                })
            })
            .collect())
    }

    fn mkdir_all(&self, path: &str) -> Result<()> {
        let mut current = String::new();
        if path.starts_with('/') {
            current.push('/');
        }

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !current.is_empty() && !current.ends_with('/') {
                current.push('/');
            }
            current.push_str(segment);

            match self.stat(&current)? {
                Some(entry) if entry.is_dir => continue,
                Some(_) => {
                    return Err(VersionerError::Remote(format!("{current} exists and is not a directory")));
                }
                None => self.sftp.mkdir(Path::new(&current), 0o755)?,
            }
        }

        Ok(())
    }

    fn upload_file(&self, local: &Path, remote: &str) -> Result<u64> {
        let mut source = File::open(local).map_err(|e| VersionerError::fs("open", local, e))?;
        let mut target = self.sftp.create(Path::new(remote))?;
        let bytes = io::copy(&mut source, &mut target)
            .map_err(|e| VersionerError::Remote(format!("Upload of {remote} failed: {e}")))?;
        Ok(bytes)
    }

    fn download_file(&self, remote: &str, local: &Path) -> Result<u64> {
        let mut source = self.sftp.open(Path::new(remote))?;
        let mut target = File::create(local).map_err(|e| VersionerError::fs("create", local, e))?;
        let bytes = io::copy(&mut source, &mut target)
            .map_err(|e| VersionerError::Remote(format!("Download of {remote} failed: {e}")))?;
        Ok(bytes)
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        if let Err(e) = self.session.disconnect(None, "closing", None) {
            warn!(error = %e, "SSH disconnect failed");
        }
    }
}
