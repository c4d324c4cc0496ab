use std::io::{self, Write};
use std::path::Path;

use tempfile::TempPath;

/// Shader source materialised as `shader_*.frag` for the filter process.
///
/// The file is deleted by [`StagedShader::remove`] or, failing that, on drop.
#[derive(Debug)]
pub struct StagedShader {
    path: TempPath,
}

impl StagedShader {
    pub fn stage(dir: &Path, source: &str) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("shader_")
            .suffix(".frag")
            .tempfile_in(dir)?;
        file.write_all(source.as_bytes())?;
        file.flush()?;

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(self) -> io::Result<()> {
        self.path.close()
    }
}
