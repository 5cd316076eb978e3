use std::path::{Component, Path, PathBuf};

use crate::core::error::{InstallError, InstallResult};

/// Normalize a pack-relative path and refuse anything that could land outside
/// the output directory.
///
/// Returns the path with `/` separators and `.` segments removed; this form is
/// what the manifest records.
pub fn safe_relative_path(raw: &str) -> InstallResult<String> {
    let unified = raw.replace('\\', "/");
    let unsafe_path = || InstallError::UnsafePath(raw.to_string());

    if unified.starts_with('/') {
        return Err(unsafe_path());
    }

    let mut parts = Vec::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(unsafe_path)?;
                // "C:" is a plain component on unix but a drive elsewhere.
                if part.contains(':') {
                    return Err(unsafe_path());
                }
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path())
            }
        }
    }

    if parts.is_empty() {
        return Err(unsafe_path());
    }
    Ok(parts.join("/"))
}

/// Absolute destination of an already validated relative path.
pub fn resolve(output_dir: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .fold(output_dir.to_path_buf(), |acc, part| acc.join(part))
}
