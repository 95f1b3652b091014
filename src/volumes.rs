//! Volume mapping
//!
//! Converts a configuration volume table into what the container engine
//! needs: the list of in-container mount points and the host bind table keyed
//! by absolute local paths.

use indexmap::IndexMap;
use path_absolutize::Absolutize;
use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// Mount points and host binds for one container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeMapping {
    /// In-container paths, in table order
    pub volumes: Vec<String>,
    /// Absolute local path to in-container path
    pub binds: IndexMap<PathBuf, String>,
}

impl VolumeMapping {
    /// Binds in the engine's `host:container:mode` notation.
    pub fn bind_specs(&self) -> Vec<String> {
        self.binds
            .iter()
            .map(|(host, container)| format!("{}:{}:rw", host.display(), container))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

/// Maps a volume table, resolving relative local paths against the current
/// working directory.
pub fn map_volumes(table: &IndexMap<String, String>) -> io::Result<VolumeMapping> {
    let cwd = env::current_dir()?;
    map_volumes_from(table, &cwd)
}

/// Maps a volume table, resolving relative local paths against `base`.
///
/// Paths are made absolute lexically: `.` and `..` components are folded but
/// symlinks are left alone and the path does not have to exist.
pub fn map_volumes_from(table: &IndexMap<String, String>, base: &Path) -> io::Result<VolumeMapping> {
    let mut mapping = VolumeMapping::default();

    for (local, container) in table {
        let host = Path::new(local).absolutize_from(base)?.into_owned();
        mapping.volumes.push(container.clone());
        mapping.binds.insert(host, container.clone());
    }

    Ok(mapping)
}
