use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::runtime::error::RuntimeError;

pub(crate) const SUBDIRECTORIES: [&str; 4] = ["workspace", "skills", "agent", "credentials"];

/// Host directory bound into an instance container.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PreparedDataDir {
    pub(crate) path: PathBuf,
    pub(crate) permission_warnings: Vec<String>,
}

impl PreparedDataDir {
    pub(crate) fn is_degraded(&self) -> bool {
        !self.permission_warnings.is_empty()
    }
}

/// Turns an owner identity into something safe for paths and container names.
///
/// ASCII letters, digits, `.` and `-` are kept. Every other byte, `_`
/// included, becomes `_` plus two hex digits, so distinct owners never share
/// a slug.
pub(crate) fn owner_slug(owner: &str) -> Result<String, RuntimeError> {
    let mut slug = String::with_capacity(owner.len());

    for byte in owner.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-' {
            slug.push(byte as char);
        } else {
            slug.push_str(&format!("_{:02x}", byte));
        }
    }

    if slug.is_empty() || slug.chars().all(|c| c == '.') {
        return Err(RuntimeError::InstanceCreationFailed(format!("Invalid owner identity: {:?}", owner)));
    }

    Ok(slug)
}

pub(crate) fn container_name(owner: &str) -> Result<String, RuntimeError> {
    Ok(format!("botyard-{}", owner_slug(owner)?))
}

pub(crate) fn data_dir_for(root: &Path, owner: &str) -> Result<PathBuf, RuntimeError> {
    Ok(root.join(owner_slug(owner)?))
}

/// Creates the owner's directory tree. Existing content is left untouched.
///
/// The container user differs from ours, so the tree is opened up with mode
/// 0777. Failing to do so is not fatal: the instance starts anyway and the
/// failures are reported in `permission_warnings`.
pub(crate) fn prepare_data_dir(root: &Path, owner: &str) -> Result<PreparedDataDir, RuntimeError> {
    let path = data_dir_for(root, owner)?;

    for subdirectory in SUBDIRECTORIES {
        let target = path.join(subdirectory);
        fs::create_dir_all(&target).map_err(|e| {
            RuntimeError::FileSystemError(format!("Cannot create {}: {}", target.display(), e))
        })?;
    }

    let mut permission_warnings = Vec::new();
    let targets = std::iter::once(path.clone()).chain(SUBDIRECTORIES.iter().map(|s| path.join(s)));

    for target in targets {
        if let Err(e) = fs::set_permissions(&target, fs::Permissions::from_mode(0o777)) {
            warn!("Cannot open permissions on {}: {}", target.display(), e);
            permission_warnings.push(format!("{}: {}", target.display(), e));
        }
    }

    Ok(PreparedDataDir { path, permission_warnings })
}
