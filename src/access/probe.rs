//! Filesystem existence checks used by the marker search.

use std::cell::Cell;
use std::io::ErrorKind;
use std::path::Path;

/// Answers whether a directory entry exists at `path`.
///
/// Implementations must not follow a final symlink: the entry itself is what
/// counts. Any error is reported as absence.
pub trait ExistenceProbe {
    fn exists(&self, path: &Path) -> bool;
}

impl<P: ExistenceProbe + ?Sized> ExistenceProbe for &P {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

/// Probe backed by `lstat(2)` via [`std::fs::symlink_metadata`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LstatProbe;

impl ExistenceProbe for LstatProbe {
    fn exists(&self, path: &Path) -> bool {
        match std::fs::symlink_metadata(path) {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                tracing::trace!(path = %path.display(), error = %e, "Marker probe failed, treating as absent");
                false
            }
        }
    }
}

/// Wraps a probe and counts how many times it was consulted.
pub struct CountingProbe<P> {
    inner: P,
    probes: Cell<u64>,
}

impl<P: ExistenceProbe> CountingProbe<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            probes: Cell::new(0),
        }
    }

    /// Number of probes performed so far.
    pub fn count(&self) -> u64 {
        self.probes.get()
    }
}

impl<P: ExistenceProbe> ExistenceProbe for CountingProbe<P> {
    fn exists(&self, path: &Path) -> bool {
        self.probes.set(self.probes.get() + 1);
        self.inner.exists(path)
    }
}
