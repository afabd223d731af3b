//! Change notification for registry observers
//!
//! Listeners are called synchronously, in registration order, right after
//! the registry mutation they describe. A listener may query the registry
//! from inside a callback but must not call its mutating methods; doing so
//! deadlocks on the registry's writer gate.

use std::sync::{Arc, RwLock};

use super::record::ContributionRecord;

/// Observer of registry changes. All methods default to no-ops.
pub trait ContributionListener: Send + Sync {
    fn contribution_added(&self, _record: &Arc<ContributionRecord>) {}

    fn contribution_removed(&self, _record: &Arc<ContributionRecord>) {}

    fn contribution_changed(
        &self,
        _old: &Arc<ContributionRecord>,
        _new: &Arc<ContributionRecord>,
    ) {
    }
}

/// A change to dispatch
#[derive(Debug, Clone)]
pub enum ContributionChange {
    Added(Arc<ContributionRecord>),
    Removed(Arc<ContributionRecord>),
    Changed {
        old: Arc<ContributionRecord>,
        new: Arc<ContributionRecord>,
    },
}

/// Ordered fan-out of change events
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: RwLock<Vec<Arc<dyn ContributionListener>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn ContributionListener>) {
        self.write().push(listener);
    }

    /// Remove a listener by identity. Returns false if it was not registered.
    pub fn remove_listener(&self, listener: &Arc<dyn ContributionListener>) -> bool {
        let mut listeners = self.write();
        match listeners.iter().position(|l| Arc::ptr_eq(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the registered listeners
    pub fn listeners(&self) -> Vec<Arc<dyn ContributionListener>> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Deliver one change to every listener.
    ///
    /// Dispatch iterates a snapshot, so listeners added during a callback
    /// only see later changes.
    pub fn notify(&self, change: &ContributionChange) {
        for listener in self.listeners() {
            match change {
                ContributionChange::Added(record) => listener.contribution_added(record),
                ContributionChange::Removed(record) => listener.contribution_removed(record),
                ContributionChange::Changed { old, new } => {
                    listener.contribution_changed(old, new)
                }
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<dyn ContributionListener>>> {
        self.listeners.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<dyn ContributionListener>>> {
        self.listeners.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod notifier_tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ContributionListener for Recorder {
        fn contribution_added(&self, record: &Arc<ContributionRecord>) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:added:{}", self.tag, record.name));
        }

        fn contribution_removed(&self, record: &Arc<ContributionRecord>) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:removed:{}", self.tag, record.name));
        }

        fn contribution_changed(
            &self,
            old: &Arc<ContributionRecord>,
            new: &Arc<ContributionRecord>,
        ) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:changed:{}->{}", self.tag, old.version, new.version));
        }
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let notifier = ChangeNotifier::new();
        notifier.add_listener(Arc::new(Recorder {
            tag: "first",
            log: log.clone(),
        }));
        notifier.add_listener(Arc::new(Recorder {
            tag: "second",
            log: log.clone(),
        }));

        let record = Arc::new(ContributionRecord::library("Minim"));
        notifier.notify(&ContributionChange::Added(record.clone()));
        notifier.notify(&ContributionChange::Changed {
            old: record.clone(),
            new: Arc::new(ContributionRecord::library("Minim").with_version(2)),
        });

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "first:added:Minim",
                "second:added:Minim",
                "first:changed:0->2",
                "second:changed:0->2",
            ]
        );
    }

    #[test]
    fn test_remove_listener_by_identity() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let notifier = ChangeNotifier::new();
        let listener: Arc<dyn ContributionListener> = Arc::new(Recorder {
            tag: "only",
            log: log.clone(),
        });
        let stranger: Arc<dyn ContributionListener> = Arc::new(Recorder::default());

        notifier.add_listener(listener.clone());
        assert!(!notifier.remove_listener(&stranger));
        assert_eq!(notifier.len(), 1);

        assert!(notifier.remove_listener(&listener));
        assert!(notifier.is_empty());

        notifier.notify(&ContributionChange::Removed(Arc::new(
            ContributionRecord::library("Minim"),
        )));
        assert!(log.lock().unwrap().is_empty());
    }
}
