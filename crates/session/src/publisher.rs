//! Latest pairing code and status, with observer fan-out.
//!
//! Delivery is synchronous and in registration order. Code notifications
//! are deduplicated by value; status notifications are not, so a reopened
//! connection always re-announces itself.
//!
//! Observers run while the publisher holds its internal locks and must not
//! call back into the publisher.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::trace;

use crate::status::SessionStatus;

pub trait SessionObserver: Send + Sync {
    /// The pairing code changed to `code` (possibly empty).
    fn code_changed(&self, code: &str);

    /// A status was published. Called even when the status is unchanged.
    fn status_published(&self, status: SessionStatus);
}

#[derive(Default)]
pub struct Publisher {
    code: Mutex<String>,
    status: Mutex<SessionStatus>,
    observers: RwLock<Vec<Arc<dyn SessionObserver>>>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn SessionObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Store `value` and notify observers if it differs from the current
    /// code. Returns whether a notification fired.
    pub fn set_code(&self, value: &str) -> bool {
        let mut code = self.code.lock().unwrap_or_else(PoisonError::into_inner);
        if *code == value {
            return false;
        }
        value.clone_into(&mut *code);
        trace!(empty = value.is_empty(), "pairing code changed");

        for observer in self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            observer.code_changed(value);
        }
        true
    }

    pub fn code(&self) -> String {
        self.code
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record `status` and notify every observer.
    pub fn publish_status(&self, status: SessionStatus) {
        let mut current = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        *current = status;

        for observer in self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            observer.status_published(status);
        }
    }

    /// Last published status.
    pub fn status(&self) -> SessionStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
