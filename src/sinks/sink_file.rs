use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::errors::SinkError;

#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Writes the credential document to a local file, replacing it atomically.
#[derive(Debug, Clone)]
pub struct FileSink {
    pub path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    /// tmp file (0600) -> rename over the destination
    pub async fn write(&self, content: &[u8]) -> Result<(), SinkError> {
        let io_error = |path: &Path, source: std::io::Error| SinkError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let tmp = tmp_path(&self.path);
        fs::write(&tmp, content).await.map_err(|e| io_error(&tmp, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(FILE_MODE);
            if let Err(e) = fs::set_permissions(&tmp, perms).await {
                let _ = fs::remove_file(&tmp).await;
                return Err(io_error(&tmp, e));
            }
        }

        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_error(&self.path, e));
        }

        info!(path = %self.path.display(), bytes = content.len(), "docker config updated");
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_is_a_sibling() {
        assert_eq!(
            tmp_path(Path::new("/root/.docker/config.json")),
            PathBuf::from("/root/.docker/config.json.tmp")
        );
    }
}
