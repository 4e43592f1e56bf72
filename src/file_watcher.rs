//! Change notifications for files written by other processes.

mod errors;
mod events;
mod internal;

use std::path::Path;
use std::time::Duration;
use futures::Stream;
use notify::RecommendedWatcher;
pub use errors::*;
pub use events::Event;
use internal::FileWatcherImpl;

pub trait FileWatcher: Send + Sync + Clone + 'static {
    type Guard: FileWatchGuard;

    /// Watch a file, or the direct children of a directory.
    fn watch(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Self::Guard, FileWatcherError>;
}

/// Stops watching when dropped.
pub trait FileWatchGuard: Send + Sync + 'static {
    fn get_events(&self) -> impl Stream<Item=Result<Event, FileWatcherError>> + Send + 'static;
}

pub type ProductionFileWatcher = FileWatcherImpl<RecommendedWatcher>;
impl ProductionFileWatcher {
    pub fn new(debounce_time: Duration) -> Result<Self, FileWatcherError> {
        FileWatcherImpl::new_impl(debounce_time)
    }
}
