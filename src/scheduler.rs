//! Debounced saves.
//!
//! [`SaveScheduler::arm`] starts a timer for a key and replaces any timer
//! armed earlier for the same key, so a burst of edits ends in a single
//! save once input stops for the whole delay.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use log::trace;
use tokio::task::JoinHandle;

pub struct SaveScheduler<K> {
    timers: Arc<Mutex<Timers<K>>>,
}

impl<K> Clone for SaveScheduler<K> {
    fn clone(&self) -> Self {
        SaveScheduler {
            timers: self.timers.clone(),
        }
    }
}

struct Timers<K> {
    next_generation: u64,
    armed: HashMap<K, Armed>,
}

struct Armed {
    generation: u64,
    task: JoinHandle<()>,
}

impl<K: Eq + Hash + Clone + Send + 'static> SaveScheduler<K> {
    pub fn new() -> Self {
        SaveScheduler {
            timers: Arc::new(
                Mutex::new(
                    Timers {
                        next_generation: 0,
                        armed: HashMap::new(),
                    }
                )
            ),
        }
    }

    /// Runs `action` after `delay` unless the key is armed again or
    /// cancelled before that. Must be called within a tokio runtime.
    pub fn arm<F, Fut>(&self, key: K, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut timers = self.lock();
        let generation = timers.next_generation;
        timers.next_generation += 1;

        let weak_timers = Arc::downgrade(&self.timers);
        let fire_key = key.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(timers) = weak_timers.upgrade() else {
                return
            };
            {
                let mut timers = timers
                    .lock()
                    .expect("failed locking the save timers");
                match timers.armed.get(&fire_key) {
                    Some(armed) if armed.generation == generation => {
                        timers.armed.remove(&fire_key);
                    },
                    _ => return,
                }
            }
            trace!("save timer {generation} fired");
            action().await;
        });

        if let Some(previous) = timers.armed.insert(key, Armed { generation, task }) {
            trace!("save timer {} re-armed as {generation}", previous.generation);
            previous.task.abort();
        }
    }

    /// Returns whether a timer was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.lock().armed.remove(key) {
            Some(armed) => {
                trace!("save timer {} cancelled", armed.generation);
                armed.task.abort();
                true
            },
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, armed) in self.lock().armed.drain() {
            armed.task.abort();
        }
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.lock().armed.contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Timers<K>> {
        self.timers
            .lock()
            .expect("failed locking the save timers")
    }
}

impl<K: Eq + Hash + Clone + Send + 'static> Default for SaveScheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}
