//! Deterministic, cycle-safe directory traversal.
//!
//! [`walk`] produces a lazy depth-first sequence of the regular files under a
//! root directory. The sequence is reproducible: within each directory,
//! children are visited in ascending lexicographic order by file name, so two
//! runs over an unchanged tree yield identical orderings on any platform.
//!
//! ## Symlinks and cycles
//!
//! Symlinks that point at directories are never followed — this keeps the
//! traversal inside the root's physical tree and rules out symlink loops.
//! Hard-link and bind-mount cycles are caught by a per-traversal visited set
//! keyed on each directory's canonical (symlink-resolved) path: once entered,
//! a directory is never entered again. Symlinks to regular files are yielded
//! like any other file.
//!
//! ## Error surface
//!
//! Exactly two conditions are swallowed, both filesystem races the batch has
//! no business dying over:
//!
//! - a directory listing failing with permission denied
//! - an entry vanishing between discovery and visit
//!
//! Everything else is yielded as a [`WalkError`] item naming the directory
//! that failed to list, for the caller to handle per-file.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A directory listing that failed mid-traversal.
#[derive(Error, Debug)]
#[error("cannot list {}: {source}", path.display())]
pub struct WalkError {
    /// The directory whose listing failed.
    pub path: PathBuf,
    pub source: io::Error,
}

/// Start a depth-first walk under `root`.
///
/// A nonexistent root produces an empty sequence; callers that consider that
/// fatal (the CLI does) must check before walking. Each call performs an
/// independent traversal with fresh cycle-detection state.
pub fn walk(root: &Path) -> Walker {
    let mut stack = Vec::new();
    if root.exists() {
        stack.push(root.to_path_buf());
    }
    Walker {
        stack,
        visited: HashSet::new(),
    }
}

/// Lazy iterator over the regular files under a root.
///
/// Directories are traversed but never yielded. See [`walk`].
pub struct Walker {
    /// Pending paths; children are pushed in reverse-sorted order so the
    /// lexicographically first child is popped first.
    stack: Vec<PathBuf>,
    /// Canonical paths of directories already entered in this traversal.
    visited: HashSet<PathBuf>,
}

impl Iterator for Walker {
    type Item = Result<PathBuf, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(cur) = self.stack.pop() {
            // Follows symlinks: a symlink to a directory reports as a
            // directory here and is then filtered out below.
            let is_dir = cur.is_dir();

            if !is_dir {
                // Vanished mid-scan: skip. Broken symlinks fall through and
                // are yielded; opening them fails per-file downstream.
                if !cur.symlink_metadata().map(|m| m.is_symlink()).unwrap_or(false)
                    && !cur.exists()
                {
                    continue;
                }
                return Some(Ok(cur));
            }

            if cur.symlink_metadata().map(|m| m.is_symlink()).unwrap_or(false) {
                // Directory symlink: never followed.
                continue;
            }

            let canonical = fs::canonicalize(&cur).unwrap_or_else(|_| cur.clone());
            if !self.visited.insert(canonical) {
                continue;
            }

            let mut children = match read_children(&cur) {
                Ok(c) => c,
                Err(e) if skippable(&e) => continue,
                Err(e) => {
                    return Some(Err(WalkError {
                        path: cur,
                        source: e,
                    }));
                }
            };
            children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
            for child in children.into_iter().rev() {
                self.stack.push(child);
            }
        }
        None
    }
}

fn read_children(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        children.push(entry?.path());
    }
    Ok(children)
}

/// Permission-denied listings and entries that vanished mid-scan are the only
/// swallowed traversal errors.
fn skippable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Create a file (and its parents) under the temp root.
    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"x").unwrap();
    }

    fn collect(root: &Path) -> Vec<String> {
        walk(root)
            .map(|r| r.unwrap())
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn yields_files_in_sorted_depth_first_order() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b/2.jpg");
        touch(tmp.path(), "b/1.jpg");
        touch(tmp.path(), "a/nested/deep.png");
        touch(tmp.path(), "a/z.jpg");
        touch(tmp.path(), "top.png");

        let files = collect(tmp.path());
        assert_eq!(
            files,
            vec!["a/nested/deep.png", "a/z.jpg", "b/1.jpg", "b/2.jpg", "top.png"]
        );
    }

    #[test]
    fn directories_are_never_yielded() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("empty/inner")).unwrap();
        touch(tmp.path(), "only.jpg");

        assert_eq!(collect(tmp.path()), vec!["only.jpg"]);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "c/x.jpg");
        touch(tmp.path(), "a/y.jpg");
        touch(tmp.path(), "b.jpg");

        let first = collect(tmp.path());
        let second = collect(tmp.path());
        assert_eq!(first, second);
    }

    #[test]
    fn each_file_yielded_exactly_once() {
        let tmp = TempDir::new().unwrap();
        for dir in ["one", "two", "three"] {
            for n in 0..4 {
                touch(tmp.path(), &format!("{dir}/{n}.jpg"));
            }
        }

        let files = collect(tmp.path());
        assert_eq!(files.len(), 12);
        let mut deduped = files.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), 12);
    }

    #[test]
    fn listing_errors_name_the_failing_directory() {
        let err = WalkError {
            path: PathBuf::from("/photos/broken-subdir"),
            source: io::Error::other("mount went away"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/photos/broken-subdir"), "{msg}");
        assert!(msg.contains("mount went away"), "{msg}");
    }

    #[test]
    fn missing_root_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("does-not-exist");
        assert_eq!(walk(&gone).count(), 0);
    }

    #[test]
    fn root_that_is_a_file_yields_itself() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "solo.jpg");
        let files = collect(&tmp.path().join("solo.jpg"));
        assert_eq!(files.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_terminates_and_is_not_followed() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "real/photo.jpg");
        // real/loop -> <root>, a cycle if followed
        symlink(tmp.path(), tmp.path().join("real/loop")).unwrap();

        let files = collect(tmp.path());
        assert_eq!(files, vec!["real/photo.jpg"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_file_is_yielded() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a/original.jpg");
        symlink(
            tmp.path().join("a/original.jpg"),
            tmp.path().join("alias.jpg"),
        )
        .unwrap();

        let files = collect(tmp.path());
        assert_eq!(files, vec!["a/original.jpg", "alias.jpg"]);
    }

    #[cfg(unix)]
    #[test]
    fn sibling_symlinked_directories_do_not_duplicate_files() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "shared/img.jpg");
        symlink(tmp.path().join("shared"), tmp.path().join("mirror")).unwrap();

        let files = collect(tmp.path());
        assert_eq!(files, vec!["shared/img.jpg"]);
    }
}
