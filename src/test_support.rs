//! Executable stand-ins for ffprobe, ffmpeg and the filter helper.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::config::settings::ToolConfig;

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Acts as the encoder when `-progress` is among its arguments (drains stdin,
/// then runs `encoder_body`), otherwise as the decoder.
pub fn fake_ffmpeg(dir: &Path, encoder_body: &str) -> PathBuf {
    write_script(
        dir,
        "ffmpeg",
        &format!(
            "for a in \"$@\"; do [ \"$a\" = \"-progress\" ] && enc=1; done\n\
             if [ -n \"$enc\" ]; then\n\
             cat > /dev/null\n\
             {encoder_body}\n\
             fi\n\
             printf 'rawframes'\n\
             exit 0\n"
        ),
    )
}

/// Prints a fixed ffprobe JSON document.
pub fn fake_ffprobe(dir: &Path, width: u32, height: u32, duration: &str) -> PathBuf {
    write_script(
        dir,
        "ffprobe",
        &format!(
            "echo '{{\"streams\":[{{\"width\":{width},\"height\":{height},\"duration\":\"{duration}\"}}]}}'\n"
        ),
    )
}

/// Pass-through filter run via `/bin/sh`; touches `seen_shader` when its
/// shader argument exists.
pub fn fake_filter(dir: &Path) -> PathBuf {
    let marker = dir.join("seen_shader");
    write_script(
        dir,
        "glfilter.sh",
        &format!("[ -f \"$4\" ] && echo present > '{}'\ncat\n", marker.display()),
    )
}

pub fn stub_tools(dir: &Path, ffmpeg: PathBuf) -> ToolConfig {
    ToolConfig {
        ffmpeg,
        ffprobe: PathBuf::from("/nonexistent/ffprobe"),
        filter_runtime: PathBuf::from("/bin/sh"),
        filter_script: fake_filter(dir),
        filter_params_env: "GL_PARAMS_JSON".into(),
    }
}
