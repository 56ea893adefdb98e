//! Demo/live mode switch.
//!
//! The flag is an atomic read on every request, so a toggle takes effect on
//! the very next call. It is persisted in the key-value store so it survives
//! restarts; persistence failures are logged and the in-memory value still
//! changes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::fmt;
use std::sync::{Arc, Mutex};

use campusgate_auth::KeyValueStore;
use tracing::{info, warn};

use crate::config::{parse_flag, DEMO_MODE_KEY};

/// Shared demo-mode flag. Clones observe the same value.
#[derive(Debug, Clone)]
pub struct ModeSwitch {
    inner: Arc<ModeInner>,
}

type ChangeHook = Box<dyn Fn(bool) + Send + Sync>;

struct ModeInner {
    demo: AtomicBool,
    store: Option<Arc<dyn KeyValueStore>>,
    key: String,
    hooks: Mutex<Vec<ChangeHook>>,
}

impl fmt::Debug for ModeInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeInner")
            .field("demo", &self.demo)
            .field("store", &self.store)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl ModeSwitch {
    /// Load the flag from `store` under the default key.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, DEMO_MODE_KEY)
    }

    /// Load the flag from `store` under `key`. A missing or unreadable
    /// value means live mode.
    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let demo = match store.get(&key) {
            Ok(Some(value)) => parse_flag(&value).unwrap_or_else(|| {
                warn!(key = %key, value = %value, "Ignoring unrecognised demo-mode value");
                false
            }),
            Ok(None) => false,
            Err(err) => {
                warn!(key = %key, error = %err, "Could not read demo-mode flag");
                false
            }
        };

        Self {
            inner: Arc::new(ModeInner {
                demo: AtomicBool::new(demo),
                store: Some(store),
                key,
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A flag that lives only in memory.
    pub fn in_memory(demo: bool) -> Self {
        Self {
            inner: Arc::new(ModeInner {
                demo: AtomicBool::new(demo),
                store: None,
                key: DEMO_MODE_KEY.to_string(),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns true while requests are served from demo data.
    pub fn is_demo(&self) -> bool {
        self.inner.demo.load(Ordering::SeqCst)
    }

    /// Register `hook` to run after every change of the flag, on whichever
    /// clone made it. Hooks receive the new value.
    pub fn on_change(&self, hook: impl Fn(bool) + Send + Sync + 'static) {
        self.inner
            .hooks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Box::new(hook));
    }

    /// Turn demo mode on or off. Returns the previous value.
    pub fn set_demo(&self, demo: bool) -> bool {
        let previous = self.inner.demo.swap(demo, Ordering::SeqCst);

        if let Some(store) = &self.inner.store {
            if let Err(err) = store.set(&self.inner.key, if demo { "true" } else { "false" }) {
                warn!(key = %self.inner.key, error = %err, "Could not persist demo-mode flag");
            }
        }

        if previous != demo {
            info!(demo, "Demo mode changed");
            let hooks = self
                .inner
                .hooks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for hook in hooks.iter() {
                hook(demo);
            }
        }

        previous
    }

    /// Flip the flag. Returns the new value.
    pub fn toggle(&self) -> bool {
        let demo = !self.is_demo();
        self.set_demo(demo);
        demo
    }
}
