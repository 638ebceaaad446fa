//! Navigation operations implementation

use super::resolver::{join, segments};
use crate::error::NavigateError;
use crate::platform::{FileKind, FileSystem};

/// Changes the working directory of a session.
///
/// Returns the new virtual working directory. The target must exist under
/// `root` and be a directory.
pub fn change_directory(
    fs: &dyn FileSystem,
    root: &str,
    working_dir: &str,
    target_path: &str,
) -> Result<String, NavigateError> {
    let segments = segments(working_dir, target_path, true);
    let real_path = join(root, &segments);
    let new_working_dir = format!("/{}", segments.join("/"));

    match fs.stat(&real_path) {
        Ok(info) if info.kind == FileKind::Dir => Ok(new_working_dir),
        Ok(_) => Err(NavigateError::NotADirectory(new_working_dir)),
        Err(_) => Err(NavigateError::NotFound(new_working_dir)),
    }
}
