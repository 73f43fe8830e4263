//! Hierarchical deny-marker search.
//!
//! # Responsibilities
//! - Reduce the request path to its containing directory
//! - Probe `root + directory + marker` for each ancestor, nearest first
//! - Stop at the first marker found or after probing the document root
//!
//! # Design Decisions
//! - Operates on the raw request path; normalization happens upstream
//! - One scratch buffer per call, reserved up front with `try_reserve_exact`
//! - Never reads outside `[root, root + request path]`

use std::collections::TryReserveError;
use std::path::Path;

use thiserror::Error;

use crate::access::probe::ExistenceProbe;

/// Errors that abort a marker search.
///
/// Everything the filesystem reports is absorbed by the probe; only running
/// out of memory for the candidate path escapes.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("cannot allocate {requested} bytes for marker candidate path")]
    Allocation {
        requested: usize,
        #[source]
        source: Option<TryReserveError>,
    },
}

/// Returns `Ok(true)` when a marker named `marker_name` exists in the
/// directory containing `request_path` or, when `recursive`, in any ancestor
/// directory up to and including `document_root`.
///
/// An empty `marker_name` disables the check and performs no probes.
pub fn check_denied<P>(
    document_root: &str,
    request_path: &str,
    marker_name: &str,
    recursive: bool,
    probe: &P,
) -> Result<bool, AccessError>
where
    P: ExistenceProbe + ?Sized,
{
    if marker_name.is_empty() {
        return Ok(false);
    }

    // Document root, path, marker and a terminator.
    let requested = document_root
        .len()
        .checked_add(request_path.len())
        .and_then(|n| n.checked_add(marker_name.len()))
        .and_then(|n| n.checked_add(1))
        .ok_or(AccessError::Allocation {
            requested: usize::MAX,
            source: None,
        })?;

    let mut candidate = String::new();
    candidate
        .try_reserve_exact(requested)
        .map_err(|e| AccessError::Allocation {
            requested,
            source: Some(e),
        })?;

    let mut uri = request_path;
    loop {
        // Cut the last path component.
        uri = uri.trim_end_matches(|c: char| c != '/');

        candidate.clear();
        candidate.push_str(document_root);
        candidate.push_str(uri);
        candidate.push_str(marker_name);

        if probe.exists(Path::new(&candidate)) {
            return Ok(true);
        }

        // Cut the separators so the next pass climbs one level.
        uri = uri.trim_end_matches('/');

        if uri.is_empty() || !recursive {
            return Ok(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    /// Records every probed path; reports presence for a fixed set.
    #[derive(Default)]
    struct RecordingProbe {
        present: HashSet<String>,
        probed: RefCell<Vec<String>>,
    }

    impl RecordingProbe {
        fn with_markers(markers: &[&str]) -> Self {
            Self {
                present: markers.iter().map(|m| m.to_string()).collect(),
                probed: RefCell::default(),
            }
        }

        fn probed(&self) -> Vec<String> {
            self.probed.borrow().clone()
        }
    }

    impl ExistenceProbe for RecordingProbe {
        fn exists(&self, path: &Path) -> bool {
            let path = path.to_string_lossy().into_owned();
            let hit = self.present.contains(&path);
            self.probed.borrow_mut().push(path);
            hit
        }
    }

    #[test]
    fn test_empty_marker_never_probes() {
        let probe = RecordingProbe::with_markers(&["/var/www/"]);
        for path in ["/", "/a/b/c.html", "", "no-slash"] {
            assert!(!check_denied("/var/www", path, "", true, &probe).unwrap());
            assert!(!check_denied("/var/www", path, "", false, &probe).unwrap());
        }
        assert!(probe.probed().is_empty());
    }

    #[test]
    fn test_marker_in_containing_directory() {
        let probe = RecordingProbe::with_markers(&["/var/www/a/b/.deny"]);
        assert!(check_denied("/var/www", "/a/b/c.html", ".deny", true, &probe).unwrap());
        assert_eq!(probe.probed(), vec!["/var/www/a/b/.deny"]);
    }

    #[test]
    fn test_marker_at_document_root() {
        let probe = RecordingProbe::with_markers(&["/var/www/.deny"]);
        assert!(check_denied("/var/www", "/a/b/c.html", ".deny", true, &probe).unwrap());
        assert_eq!(
            probe.probed(),
            vec!["/var/www/a/b/.deny", "/var/www/a/.deny", "/var/www/.deny"]
        );
    }

    #[test]
    fn test_no_marker_probes_every_level() {
        let probe = RecordingProbe::default();
        assert!(!check_denied("/var/www", "/a/b/c/d.html", ".deny", true, &probe).unwrap());
        // depth 3 directory portion + document root
        assert_eq!(probe.probed().len(), 4);
        assert_eq!(probe.probed().last().unwrap(), "/var/www/.deny");
    }

    #[test]
    fn test_root_request_probes_once() {
        let probe = RecordingProbe::default();
        assert!(!check_denied("/var/www", "/", ".deny", true, &probe).unwrap());
        assert_eq!(probe.probed(), vec!["/var/www/.deny"]);
    }

    #[test]
    fn test_directory_request() {
        let probe = RecordingProbe::default();
        assert!(!check_denied("/var/www", "/a/b/", ".deny", true, &probe).unwrap());
        assert_eq!(
            probe.probed(),
            vec!["/var/www/a/b/.deny", "/var/www/a/.deny", "/var/www/.deny"]
        );
    }

    #[test]
    fn test_path_without_slash_probes_root() {
        let probe = RecordingProbe::default();
        assert!(!check_denied("/var/www/", "index.html", ".deny", true, &probe).unwrap());
        assert_eq!(probe.probed(), vec!["/var/www/.deny"]);
    }

    #[test]
    fn test_consecutive_slashes_collapse() {
        let probe = RecordingProbe::default();
        assert!(!check_denied("/var/www", "/a//b///c.html", ".deny", true, &probe).unwrap());
        assert_eq!(
            probe.probed(),
            vec!["/var/www/a//b///.deny", "/var/www/a//.deny", "/var/www/.deny"]
        );
    }

    #[test]
    fn test_non_recursive_probes_containing_directory_only() {
        let probe = RecordingProbe::with_markers(&["/var/www/.deny"]);
        assert!(!check_denied("/var/www", "/a/b/c.html", ".deny", false, &probe).unwrap());
        assert_eq!(probe.probed(), vec!["/var/www/a/b/.deny"]);

        let probe = RecordingProbe::with_markers(&["/var/www/a/b/.deny"]);
        assert!(check_denied("/var/www", "/a/b/c.html", ".deny", false, &probe).unwrap());
    }

    #[test]
    fn test_non_recursive_at_root_level() {
        let probe = RecordingProbe::with_markers(&["/var/www/.deny"]);
        assert!(check_denied("/var/www", "/c.html", ".deny", false, &probe).unwrap());
        assert_eq!(probe.probed().len(), 1);
    }

    #[test]
    fn test_marker_below_request_is_ignored() {
        let probe = RecordingProbe::with_markers(&["/var/www/a/b/c/.deny"]);
        assert!(!check_denied("/var/www", "/a/b/c", ".deny", true, &probe).unwrap());
        assert!(!probe.probed().iter().any(|p| p.starts_with("/var/www/a/b/c/")));
    }

    #[test]
    fn test_repeated_calls_agree() {
        let probe = RecordingProbe::with_markers(&["/var/www/a/.deny"]);
        let first = check_denied("/var/www", "/a/b/c.html", ".deny", true, &probe).unwrap();
        let second = check_denied("/var/www", "/a/b/c.html", ".deny", true, &probe).unwrap();
        assert!(first && second);
        assert_eq!(probe.probed().len(), 4);
    }

    #[test]
    fn test_filesystem_walk() {
        use crate::access::probe::{CountingProbe, LstatProbe};

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/.deny"), b"").unwrap();
        let root = dir.path().to_str().unwrap();

        let probe = CountingProbe::new(LstatProbe);
        assert!(check_denied(root, "/a/b/c.html", ".deny", true, &probe).unwrap());
        assert_eq!(probe.count(), 2);

        // Intermediate directories need not exist.
        assert!(check_denied(root, "/a/missing/deeper/x", ".deny", true, &LstatProbe).unwrap());
        assert!(!check_denied(root, "/other/x", ".deny", true, &LstatProbe).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_marker_denies() {
        use crate::access::probe::LstatProbe;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::os::unix::fs::symlink("/does/not/exist", dir.path().join("docs/.deny")).unwrap();
        let root = dir.path().to_str().unwrap();

        assert!(check_denied(root, "/docs/readme.txt", ".deny", false, &LstatProbe).unwrap());
    }
}
