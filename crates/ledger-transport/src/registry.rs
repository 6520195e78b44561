use std::sync::Mutex;

/// An observer registry with snapshot-iteration semantics (§9 design notes):
/// notifying a handler clones the current handler list first, so a handler
/// that registers another handler (or otherwise mutates the registry) from
/// within its own callback never deadlocks and never sees itself invoked
/// twice in the same notification pass.
pub struct Registry<H: Clone> {
    handlers: Mutex<Vec<H>>,
}

impl<H: Clone> Default for Registry<H> {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }
}

impl<H: Clone> Registry<H> {
    pub fn push(&self, handler: H) {
        self.handlers.lock().expect("registry mutex poisoned").push(handler);
    }

    /// A point-in-time copy of the registered handlers, safe to iterate
    /// without holding the lock.
    pub fn snapshot(&self) -> Vec<H> {
        self.handlers.lock().expect("registry mutex poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type Handler = Arc<dyn Fn() + Send + Sync>;

    #[test]
    fn snapshot_reflects_handlers_pushed_so_far() {
        let registry: Registry<Handler> = Registry::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_a = calls.clone();
        registry.push(Arc::new(move || {
            calls_a.fetch_add(1, Ordering::SeqCst);
        }));

        for handler in registry.snapshot() {
            handler();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A handler registering a second handler mid-notification must not
        // see that new handler invoked within the same pass.
        let registry_clone = Arc::new(registry);
        let r2 = registry_clone.clone();
        let calls_b = calls.clone();
        registry_clone.push(Arc::new(move || {
            r2.push(Arc::new(|| {}));
            calls_b.fetch_add(1, Ordering::SeqCst);
        }));

        let snapshot = registry_clone.snapshot();
        assert_eq!(snapshot.len(), 2);
        for handler in snapshot {
            handler();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(registry_clone.snapshot().len(), 3);
    }
}
