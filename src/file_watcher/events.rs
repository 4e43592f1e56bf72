use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// Something under the watched path was created, modified or removed.
    Changed(Vec<PathBuf>),
}

impl Event {
    pub fn touches(&self, path: &Path) -> bool {
        match self {
            Event::Changed(paths) => paths.iter().any(|p| p == path),
        }
    }
}
