
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use notify_debouncer_full::{new_debouncer_opt, DebounceEventHandler, DebounceEventResult, DebouncedEvent, Debouncer, RecommendedCache};
use tokio::sync::broadcast;
use notify::{EventKind, RecursiveMode};
use futures::Stream;
use async_stream::stream;
use log::{debug, error, log_enabled, trace, warn};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use crate::file_watcher::{Event, FileWatchGuard, FileWatcher, FileWatcherError};

const FILE_WATCHER_BUFFER_SIZE: usize = 16;

#[derive(Clone, Debug)]
enum InternalEvent {
    Event(DebouncedEvent),
    Error {
        message: String,
        paths: Vec<PathBuf>,
    },
}

pub struct FileWatcherImpl<W: notify::Watcher> {
    inner: Arc<Mutex<FileWatcherInternal<W>>>,
}

impl<W: notify::Watcher> Clone for FileWatcherImpl<W> {
    fn clone(&self) -> Self {
        FileWatcherImpl {
            inner: self.inner.clone(),
        }
    }
}

struct FileWatcherInternal<W: notify::Watcher> {
    watcher: Debouncer<W, RecommendedCache>,
    events: broadcast::Sender<InternalEvent>,
}

impl<W: notify::Watcher + Send + Sync + 'static> FileWatcher for FileWatcherImpl<W> {
    type Guard = FileWatchGuardImpl<W>;

    fn watch(
        &self,
        path: impl AsRef<Path>
    ) -> Result<FileWatchGuardImpl<W>, FileWatcherError> {
        let path = path.as_ref().to_owned();
        let mut inner = self.inner
            .lock()
            .expect("failed locking the file watcher");
        inner
            .watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(FileWatcherError::WatchStart)?;
        debug!("starting to watch path \"{}\"", path.display());
        Ok(
            FileWatchGuardImpl {
                path,
                file_watcher: self.inner.clone(),
            }
        )
    }
}

impl<W: notify::Watcher> FileWatcherImpl<W> {
    pub fn new_impl(debounce_time: Duration) -> Result<Self, FileWatcherError> {
        let (sender, _) = broadcast::channel(FILE_WATCHER_BUFFER_SIZE);
        Ok(
            FileWatcherImpl {
                inner: Arc::new(
                    Mutex::new(
                        FileWatcherInternal {
                            watcher: new_debouncer_opt(
                                debounce_time,
                                None,
                                Callback(sender.clone()),
                                Default::default(),
                                Default::default(),
                            )
                                .map_err(FileWatcherError::Init)?,
                            events: sender,
                        }
                    )
                ),
            }
        )
    }
}

struct Callback(broadcast::Sender<InternalEvent>);
impl DebounceEventHandler for Callback {
    fn handle_event(&mut self, event: DebounceEventResult) {
        match event {
            Ok(v) => v.into_iter().for_each(|v| {
                trace!("file event received: {v:?}");
                // the only possible error is not having subscribers
                let _ = self.0.send(InternalEvent::Event(v));
            }),

            Err(e) => e.into_iter().for_each(|e| {
                error!("file watching error: {e}");
                let _ = self.0.send(
                    InternalEvent::Error {
                        message: e.to_string(),
                        paths: e.paths,
                    }
                );
            })
        }
    }
}

pub struct FileWatchGuardImpl<W: notify::Watcher> {
    path: PathBuf,
    file_watcher: Arc<Mutex<FileWatcherInternal<W>>>,
}

impl<W: notify::Watcher> Drop for FileWatchGuardImpl<W> {
    fn drop(&mut self) {
        debug!("stopping watching path \"{}\"", self.path.display());
        let unwatched = self.file_watcher
            .lock().expect("failed locking the file watcher")
            .watcher
            .unwatch(&self.path);
        if let Err(e) = unwatched {
            warn!("failed to unwatch \"{}\": {e}", self.path.display());
        }
    }
}

fn is_under(watched: &Path, path: &Path) -> bool {
    path == watched || path.parent() == Some(watched)
}

impl<W: notify::Watcher + Send + Sync + 'static> FileWatchGuard for FileWatchGuardImpl<W> {
    fn get_events(&self) -> impl Stream<Item=Result<Event, FileWatcherError>> + Send + 'static {
        let lock = self.file_watcher
            .lock().expect("failed locking the file watcher");
        let path = self.path.clone();
        let filter_path = path.clone();
        let mut receiver = BroadcastStream
            ::from(lock.events.subscribe())
            .filter(move |event| match event {
                Ok(InternalEvent::Event(event)) => event.paths
                    .iter()
                    .any(|p| is_under(&filter_path, p)),
                Ok(InternalEvent::Error { paths, .. }) => paths.is_empty()
                    || paths.iter().any(|p| is_under(&filter_path, p)),
                _ => true
            });
        drop(lock);

        let path_display = if log_enabled!(log::Level::Trace) {
            Cow::Owned(format!("{}", self.path.display()))
        } else {
            Cow::Borrowed("")
        };
        stream! {
            trace!("observing file changes for path \"{path_display}\"");
            while let Some(event) = receiver.next().await {
                match event {
                    Ok(InternalEvent::Event(event)) => match event.kind {
                        EventKind::Create(_) |
                            EventKind::Modify(_) |
                            EventKind::Remove(_)
                        => {
                            let e = Event::Changed(
                                event.paths
                                    .iter()
                                    .filter(|p| is_under(&path, p))
                                    .cloned()
                                    .collect()
                            );
                            trace!("event on path \"{path_display}\": {e:?}");
                            yield Ok(e);
                        },

                        _ => trace!("skipping event {event:?}"),
                    },
                    Ok(InternalEvent::Error { message, .. }) => {
                        yield Err(FileWatcherError::Watch(message));
                    },
                    Err(BroadcastStreamRecvError::Lagged(n)) => {
                        yield Err(FileWatcherError::Overflow(n));
                    },
                }
            }
            trace!("file event stream for \"{path_display}\" finished");
        }
    }
}
