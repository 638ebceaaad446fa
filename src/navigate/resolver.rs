//! Path resolution
//!
//! Maps client paths onto server paths confined to an account root. Paths are
//! handled as a list of segments: empty segments collapse repeated slashes,
//! "." is dropped and ".." pops the previous segment but never climbs above
//! the root.

/// Splits the virtual path named by `path` (absolute, or relative to
/// `working_dir`) into segments.
pub(crate) fn segments<'a>(working_dir: &'a str, path: &'a str, normalize: bool) -> Vec<&'a str> {
    let absolute = path.starts_with('/') || path == working_dir;
    let base: &'a str = if absolute { "" } else { working_dir };

    let mut segments = Vec::new();
    for segment in base.split('/').chain(path.split('/')) {
        match segment {
            "" => {}
            "." if normalize => {}
            ".." if normalize => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments
}

/// Joins `segments` under `root`. A root of "/" contributes no prefix.
pub(crate) fn join(root: &str, segments: &[&str]) -> String {
    let base = root.trim_end_matches('/');
    if segments.is_empty() {
        return if base.is_empty() {
            "/".to_string()
        } else {
            base.to_string()
        };
    }

    let mut out = String::with_capacity(base.len() + segments.iter().map(|s| s.len() + 1).sum::<usize>());
    out.push_str(base);
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Resolves a client path to a server path under `root`.
///
/// `path` is taken as root-relative when it starts with '/' or equals the
/// working directory, and relative to `working_dir` otherwise. With
/// `normalize` set, "." and ".." segments are resolved; ".." at the root is
/// ignored. The result never carries a trailing slash unless it is "/".
pub fn resolve(root: &str, working_dir: &str, path: &str, normalize: bool) -> String {
    join(root, &segments(working_dir, path, normalize))
}

/// Virtual (root-relative) form of a client path, always starting with '/'.
pub fn virtual_path(working_dir: &str, path: &str) -> String {
    let segments = segments(working_dir, path, true);
    format!("/{}", segments.join("/"))
}
