//! Memoised asset loads.
//!
//! An [`AssetCache`] maps a source URL to a [`SharedLoad`]. The first request
//! for a URL starts the load; later requests attach to the same handle, so a
//! URL is fetched at most once no matter how many callers ask for it while
//! it is in flight. Successful results stay cached for the life of the
//! cache. Failed loads are evicted so the next request retries.
//!
//! Loads run according to an [`Executor`]: `Threaded` spawns one worker per
//! load (the interactive viewer), `Inline` resolves before `request` returns
//! (tests and local tooling).

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::AssetError;

pub type LoadResult<T> = Result<Arc<T>, AssetError>;

type Callback<T> = Box<dyn FnOnce(&LoadResult<T>) + Send>;

enum SlotState<T> {
    Pending(Vec<Callback<T>>),
    Ready(LoadResult<T>),
}

struct Slot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> Slot<T> {
    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a load that resolves exactly once.
pub struct SharedLoad<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for SharedLoad<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> SharedLoad<T> {
    fn pending() -> Self {
        Self {
            slot: Arc::new(Slot {
                state: Mutex::new(SlotState::Pending(Vec::new())),
                ready: Condvar::new(),
            }),
        }
    }

    /// An already-resolved handle.
    pub fn resolved(result: LoadResult<T>) -> Self {
        Self {
            slot: Arc::new(Slot {
                state: Mutex::new(SlotState::Ready(result)),
                ready: Condvar::new(),
            }),
        }
    }

    fn resolve(&self, result: LoadResult<T>) {
        let callbacks = {
            let mut state = self.slot.lock();
            match &mut *state {
                SlotState::Ready(_) => {
                    warn!("asset load resolved twice; keeping first result");
                    return;
                }
                SlotState::Pending(callbacks) => {
                    let callbacks = std::mem::take(callbacks);
                    *state = SlotState::Ready(result.clone());
                    callbacks
                }
            }
        };
        self.slot.ready.notify_all();
        for callback in callbacks {
            callback(&result);
        }
    }

    /// Runs `callback` once the load resolves, or immediately if it already has.
    pub fn on_ready(&self, callback: impl FnOnce(&LoadResult<T>) + Send + 'static) {
        let ready = {
            let mut state = self.slot.lock();
            match &mut *state {
                SlotState::Pending(callbacks) => {
                    callbacks.push(Box::new(callback));
                    return;
                }
                SlotState::Ready(result) => result.clone(),
            }
        };
        callback(&ready);
    }

    /// Non-blocking peek at the result.
    pub fn try_get(&self) -> Option<LoadResult<T>> {
        match &*self.slot.lock() {
            SlotState::Pending(_) => None,
            SlotState::Ready(result) => Some(result.clone()),
        }
    }

    /// Blocks until the load resolves.
    pub fn wait(&self) -> LoadResult<T> {
        let mut state = self.slot.lock();
        loop {
            if let SlotState::Ready(result) = &*state {
                return result.clone();
            }
            state = self
                .slot
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks for at most `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<LoadResult<T>> {
        let state = self.slot.lock();
        let (state, _) = self
            .slot
            .ready
            .wait_timeout_while(state, timeout, |state| matches!(state, SlotState::Pending(_)))
            .unwrap_or_else(PoisonError::into_inner);
        match &*state {
            SlotState::Pending(_) => None,
            SlotState::Ready(result) => Some(result.clone()),
        }
    }

    fn same_as(&self, other: &SharedLoad<T>) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Executor {
    Inline,
    #[default]
    Threaded,
}

/// URL-keyed cache of shared loads.
pub struct AssetCache<T> {
    entries: Arc<Mutex<HashMap<String, SharedLoad<T>>>>,
    executor: Executor,
}

impl<T> Clone for AssetCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            executor: self.executor,
        }
    }
}

impl<T: Send + Sync + 'static> AssetCache<T> {
    pub fn new(executor: Executor) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            executor,
        }
    }

    pub fn executor(&self) -> Executor {
        self.executor
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, SharedLoad<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }

    /// Returns the cached handle for `key`, or starts `load` and caches it.
    pub fn request<F>(&self, key: &str, load: F) -> SharedLoad<T>
    where
        F: FnOnce() -> Result<T, AssetError> + Send + 'static,
    {
        let handle = {
            let mut entries = self.entries();
            if let Some(existing) = entries.get(key) {
                debug!(key, "asset cache hit");
                return existing.clone();
            }
            let handle = SharedLoad::pending();
            entries.insert(key.to_string(), handle.clone());
            handle
        };

        debug!(key, executor = ?self.executor, "starting asset load");
        let job = LoadJob {
            key: key.to_string(),
            handle: handle.clone(),
            entries: Arc::clone(&self.entries),
        };
        match self.executor {
            Executor::Inline => job.run(load),
            Executor::Threaded => {
                let key = key.to_string();
                let fallback = job.handle.clone();
                let spawned = thread::Builder::new()
                    .name(format!("asset-load:{}", short_name(&key)))
                    .spawn(move || job.run(load));
                if let Err(err) = spawned {
                    warn!(key = %key, error = %err, "failed to spawn asset worker");
                    self.entries().remove(&key);
                    fallback.resolve(Err(AssetError::WorkerLost(key)));
                }
            }
        }
        handle
    }
}

struct LoadJob<T> {
    key: String,
    handle: SharedLoad<T>,
    entries: Arc<Mutex<HashMap<String, SharedLoad<T>>>>,
}

impl<T> LoadJob<T> {
    fn run<F>(self, load: F)
    where
        F: FnOnce() -> Result<T, AssetError>,
    {
        let result = match panic::catch_unwind(AssertUnwindSafe(load)) {
            Ok(result) => result.map(Arc::new),
            Err(_) => Err(AssetError::WorkerLost(self.key.clone())),
        };
        if let Err(err) = &result {
            warn!(key = %self.key, error = %err, "asset load failed");
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries
                .get(&self.key)
                .is_some_and(|current| current.same_as(&self.handle))
            {
                entries.remove(&self.key);
            }
        } else {
            debug!(key = %self.key, "asset load finished");
        }
        self.handle.resolve(result);
    }
}

fn short_name(key: &str) -> &str {
    key.rsplit('/').find(|segment| !segment.is_empty()).unwrap_or(key)
}
