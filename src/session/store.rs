use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Fixed key (and file name) under which the bearer token is persisted
pub const TOKEN_KEY: &str = "access_token";

/// Persistent storage for one raw bearer token
pub trait TokenStore: Send + Sync {
    fn load(&self) -> io::Result<Option<String>>;
    fn store(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;

    /// Stored token, if any. Blank tokens and read failures count as none;
    /// failures are logged.
    fn current(&self) -> Option<String> {
        match self.load() {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored token");
                None
            }
        }
    }
}

/// Token kept in a single file holding the raw string
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/access_token`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(TOKEN_KEY))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                Ok(if token.is_empty() { None } else { Some(token.to_string()) })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Process-local token, used by tests and embedding callers
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        let guard = self
            .token
            .read()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "token lock poisoned"))?;
        Ok(guard.clone())
    }

    fn store(&self, token: &str) -> io::Result<()> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "token lock poisoned"))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "token lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}
