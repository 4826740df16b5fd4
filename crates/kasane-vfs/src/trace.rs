//! Per-query diagnostics: call counts and collection visits.
//!
//! A [`QueryTrace`] is opened at the public query boundary and threaded
//! through every reader taking part in the resolution. It is purely
//! observational — nothing in the resolution algorithms reads it back.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

/// Collects counters for one logical `by_path` or `by_glob` query.
#[derive(Debug)]
pub struct QueryTrace {
    name: String,
    started: Instant,
    path_calls: AtomicUsize,
    glob_calls: AtomicUsize,
    collections: Mutex<BTreeMap<String, usize>>,
}

impl QueryTrace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Instant::now(),
            path_calls: AtomicUsize::new(0),
            glob_calls: AtomicUsize::new(0),
            collections: Mutex::new(BTreeMap::new()),
        }
    }

    /// Record one adapter-level path lookup.
    pub fn path_call(&self) {
        self.path_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one adapter-level glob run.
    pub fn glob_call(&self) {
        self.glob_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a collection taking part in the query.
    pub fn collection(&self, name: &str) {
        *self.collections.lock().entry(name.to_string()).or_insert(0) += 1;
    }

    /// Emit the collected counters through `tracing`.
    pub fn report(&self) {
        let collections = self.collections.lock();
        tracing::trace!(
            query = %self.name,
            elapsed_us = self.started.elapsed().as_micros() as u64,
            path_calls = self.path_calls.load(Ordering::Relaxed),
            glob_calls = self.glob_calls.load(Ordering::Relaxed),
            collections = ?collections,
            "query finished"
        );
    }
}
