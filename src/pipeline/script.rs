//! Temporary build script file

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::{Builder, TempPath};

const SCRIPT_PREFIX: &str = "berth-build-";
const SCRIPT_SUFFIX: &str = ".sh";
const DEFAULT_SHEBANG: &str = "#!/bin/sh\n";

/// The build script written to disk for the build container.
///
/// The file is deleted when this value is dropped, so every way out of the
/// build phase cleans it up. [`BuildScriptFile::remove`] deletes it early and
/// reports errors.
#[derive(Debug)]
pub struct BuildScriptFile {
    path: TempPath,
}

impl BuildScriptFile {
    /// Writes `script` to a new `berth-build-*.sh` file in `dir` with mode 0755.
    ///
    /// Scripts without an interpreter line get `#!/bin/sh` so the container
    /// can execute the file directly.
    pub fn create(script: &str, dir: &Path) -> io::Result<Self> {
        let mut file = Builder::new()
            .prefix(SCRIPT_PREFIX)
            .suffix(SCRIPT_SUFFIX)
            .tempfile_in(dir)?;

        if !script.starts_with("#!") {
            file.write_all(DEFAULT_SHEBANG.as_bytes())?;
        }
        file.write_all(script.as_bytes())?;
        if !script.ends_with('\n') {
            file.write_all(b"\n")?;
        }
        file.flush()?;

        set_executable(file.path())?;

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the script is mounted inside the container: its file name at `/`.
    pub fn container_path(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("/{}", name)
    }

    pub fn remove(self) -> io::Result<()> {
        self.path.close()
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(path: &Path) -> io::Result<()> {
    fs::metadata(path).map(|_| ())
}
