//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Mutex, MutexGuard};

/// Process-wide environment variables are shared by every test thread.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_lock() -> MutexGuard<'static, ()> {
    // A panicking test must not wedge the remaining env tests.
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs `f` with environment variables temporarily changed.
///
/// `Some(value)` sets a variable, `None` removes it. The previous values are
/// restored afterwards, also when `f` panics.
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = env_lock();
    let _restore = EnvRestore::apply(changes);
    f()
}

/// Runs `f` with every variable in `cleared` removed, then `overrides` applied.
pub fn with_clean_env<F, R>(cleared: &[&str], overrides: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let mut changes: Vec<(&str, Option<&str>)> = cleared.iter().map(|k| (*k, None)).collect();
    changes.extend_from_slice(overrides);
    with_scoped_env(&changes, f)
}

struct EnvRestore {
    previous: Vec<(String, Option<String>)>,
}

impl EnvRestore {
    fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        let mut previous: Vec<(String, Option<String>)> = Vec::new();
        for (key, _) in changes {
            if !previous.iter().any(|(k, _)| k == key) {
                previous.push((key.to_string(), std::env::var(key).ok()));
            }
        }

        for (key, value) in changes {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }

        Self { previous }
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}
