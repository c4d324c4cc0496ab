use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

/// Upload and output directories on the local filesystem.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(upload_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            upload_dir,
            output_dir,
        }
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        info!(
            upload = %self.upload_dir.display(),
            output = %self.output_dir.display(),
            "storage directories ready"
        );
        Ok(())
    }

    /// Fresh unique name for an uploaded file: `<uuid-hex>_<client name>`.
    pub fn upload_name(client_name: &str) -> String {
        let base = Path::new(client_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .replace(' ', "_");
        format!("{}_{}", Uuid::new_v4().simple(), base)
    }

    /// Path of a previously uploaded file. Only bare file names are accepted.
    pub fn resolve_upload(&self, name: &str) -> Option<PathBuf> {
        is_bare_name(name).then(|| self.upload_dir.join(name))
    }
}

fn is_bare_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
