use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Default bound for a subscription's tail buffer.
pub const DEFAULT_TAIL_CAPACITY: usize = 10_000;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One audit/progress event emitted by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    /// Logger/source identifier, e.g. `massedit.store.Address`.
    pub source: String,
    pub message: String,
    pub at_ms: u64,
}

impl AuditEvent {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            at_ms: now_ms(),
        }
    }
}

/// Restricts a subscription to events from a small set of known sources, so
/// unrelated traffic from concurrent operations is excluded. A pattern is
/// either an exact source name or a `prefix*` wildcard.
#[derive(Debug, Clone, Default)]
pub struct SourceMatcher {
    patterns: Vec<String>,
}

impl SourceMatcher {
    pub fn new(patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, source: &str) -> bool {
        self.patterns.iter().any(|p| match p.strip_suffix('*') {
            Some(prefix) => source.starts_with(prefix),
            None => p == source,
        })
    }
}

/// A bounded, named, user-scoped tail of matching audit events.
///
/// One sequential writer (whichever thread runs the batch) and any number of
/// polling readers share it; a single mutex around the buffer is sufficient
/// since writes never interleave within a batch.
pub struct LogSubscription {
    pub title: String,
    pub display_title: String,
    pub owner: String,
    matcher: SourceMatcher,
    max_size: usize,
    buffer: Mutex<VecDeque<AuditEvent>>,
}

impl LogSubscription {
    fn new(
        owner: &str,
        title: &str,
        display_title: &str,
        matcher: SourceMatcher,
        max_size: usize,
    ) -> Self {
        Self {
            title: title.into(),
            display_title: display_title.into(),
            owner: owner.into(),
            matcher,
            max_size,
            buffer: Mutex::new(VecDeque::new()),
        }
    }

    /// Buffer the event if its source matches, evicting oldest-first once
    /// the bound is exceeded.
    fn offer(&self, event: &AuditEvent) {
        if !self.matcher.matches(&event.source) {
            return;
        }
        let Ok(mut buf) = self.buffer.lock() else {
            return;
        };
        if buf.len() >= self.max_size {
            buf.pop_front();
        }
        buf.push_back(event.clone());
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All currently buffered events, oldest first.
    pub fn snapshot(&self) -> Vec<AuditEvent> {
        self.buffer
            .lock()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The `n` most recent events, oldest first.
    pub fn tail(&self, n: usize) -> Vec<AuditEvent> {
        self.buffer
            .lock()
            .map(|b| b.iter().rev().take(n).rev().cloned().collect())
            .unwrap_or_default()
    }
}

/// Shared publish handle plus the subscription registry.
///
/// Cloning is cheap; the persistence layer holds one clone as its writer
/// handle while polling clients resolve subscriptions through another.
#[derive(Clone, Default)]
pub struct AuditBus {
    subscriptions: Arc<Mutex<BTreeMap<(String, String), Arc<LogSubscription>>>>,
}

impl AuditBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent per `(owner, title)`: repeated polls get the existing
    /// subscription back instead of a fresh buffer. Created lazily on the
    /// first request for a given title.
    pub fn ensure_subscription(
        &self,
        owner: &str,
        title: &str,
        display_title: &str,
        matcher: SourceMatcher,
        max_size: usize,
    ) -> Arc<LogSubscription> {
        let Ok(mut subs) = self.subscriptions.lock() else {
            // Poisoned registry: hand back a detached buffer rather than
            // panicking in a polling path.
            return Arc::new(LogSubscription::new(
                owner,
                title,
                display_title,
                matcher,
                max_size,
            ));
        };
        subs.entry((owner.to_string(), title.to_string()))
            .or_insert_with(|| {
                Arc::new(LogSubscription::new(
                    owner,
                    title,
                    display_title,
                    matcher,
                    max_size,
                ))
            })
            .clone()
    }

    pub fn get_subscription(&self, owner: &str, title: &str) -> Option<Arc<LogSubscription>> {
        self.subscriptions
            .lock()
            .ok()?
            .get(&(owner.to_string(), title.to_string()))
            .cloned()
    }

    /// Drop one subscription; the surrounding service decides the idle
    /// policy.
    pub fn remove_subscription(&self, owner: &str, title: &str) {
        if let Ok(mut subs) = self.subscriptions.lock() {
            subs.remove(&(owner.to_string(), title.to_string()));
        }
    }

    /// Fan the event out to every subscription whose matcher accepts it.
    pub fn publish(&self, event: AuditEvent) {
        let subs: Vec<Arc<LogSubscription>> = match self.subscriptions.lock() {
            Ok(subs) => subs.values().cloned().collect(),
            Err(_) => return,
        };
        for sub in subs {
            sub.offer(&event);
        }
    }
}
