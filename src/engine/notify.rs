// SPDX-License-Identifier: GPL-3.0-only

//! Status and error fan-out to registered observers
//!
//! Observers are invoked synchronously, in registration order, on whatever
//! thread raised the notification (usually a stream worker). A consumer that
//! lives on another thread, such as a UI loop, has to marshal the message
//! itself.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info};
use uuid::Uuid;

/// Callback receiving a notification message
pub type Observer = Arc<dyn Fn(&str) + Send + Sync>;

/// Handle returned on registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

#[derive(Default)]
struct Registry {
    entries: Vec<(ObserverId, Observer)>,
}

impl Registry {
    /// Register `observer` unless the same callback is already present
    fn insert(&mut self, observer: Observer) -> ObserverId {
        if let Some((id, _)) = self
            .entries
            .iter()
            .find(|(_, existing)| std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(&observer)))
        {
            return *id;
        }

        let id = ObserverId(Uuid::new_v4());
        self.entries.push((id, observer));
        id
    }

    fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    fn snapshot(&self) -> Vec<Observer> {
        self.entries.iter().map(|(_, o)| Arc::clone(o)).collect()
    }
}

/// De-duplicated registries of status and error observers
#[derive(Default)]
pub struct NotificationHub {
    status: Mutex<Registry>,
    errors: Mutex<Registry>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Best effort text of a panic payload
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run every observer, isolating panics
fn dispatch(kind: &str, observers: Vec<Observer>, message: &str) {
    for observer in observers {
        let result = panic::catch_unwind(AssertUnwindSafe(|| observer(message)));
        if let Err(payload) = result {
            error!(
                kind,
                panic = %panic_message(payload.as_ref()),
                "Observer panicked"
            );
        }
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a status observer; registering the same `Arc` twice is a no-op
    /// returning the original id
    pub fn register_status(&self, observer: Observer) -> ObserverId {
        lock(&self.status).insert(observer)
    }

    /// Register an error observer; registering the same `Arc` twice is a no-op
    /// returning the original id
    pub fn register_error(&self, observer: Observer) -> ObserverId {
        lock(&self.errors).insert(observer)
    }

    /// Remove an observer from whichever registry holds it
    pub fn unregister(&self, id: ObserverId) -> bool {
        lock(&self.status).remove(id) || lock(&self.errors).remove(id)
    }

    pub fn notify_status(&self, message: &str) {
        info!(status = %message);
        // Snapshot so observers may register or unregister while running
        let observers = lock(&self.status).snapshot();
        dispatch("status", observers, message);
    }

    pub fn notify_error(&self, message: &str) {
        error!(error = %message);
        let observers = lock(&self.errors).snapshot();
        dispatch("error", observers, message);
    }

    /// Drop every registered observer
    pub fn clear(&self) {
        lock(&self.status).entries.clear();
        lock(&self.errors).entries.clear();
    }

    pub fn status_observer_count(&self) -> usize {
        lock(&self.status).entries.len()
    }

    pub fn error_observer_count(&self) -> usize {
        lock(&self.errors).entries.len()
    }
}
