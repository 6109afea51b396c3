//! Interface slots shared by the audio and voice registries

use std::sync::Arc;

/// Maximum number of observers that may be registered for one source
pub const MAX_OBSERVERS: usize = 6;

/// Outcome of registering an interface in a single slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotChange {
    /// The same interface was already registered
    Unchanged,
    /// The slot was empty
    Registered,
    /// A different interface was registered and has been replaced
    Replaced,
}

/// Holds at most one interface
pub(crate) struct Slot<T: ?Sized> {
    iface: Option<Arc<T>>,
}

impl<T: ?Sized> Slot<T> {
    pub(crate) fn new() -> Self {
        Self { iface: None }
    }

    pub(crate) fn register(&mut self, iface: Arc<T>) -> SlotChange {
        match &self.iface {
            Some(current) if Arc::ptr_eq(current, &iface) => SlotChange::Unchanged,
            Some(_) => {
                self.iface = Some(iface);
                SlotChange::Replaced
            }
            None => {
                self.iface = Some(iface);
                SlotChange::Registered
            }
        }
    }

    pub(crate) fn clear(&mut self) -> bool {
        self.iface.take().is_some()
    }

    pub(crate) fn get(&self) -> Option<&T> {
        self.iface.as_deref()
    }

    pub(crate) fn is_registered(&self) -> bool {
        self.iface.is_some()
    }
}

/// Holds up to [`MAX_OBSERVERS`] interfaces in registration order
pub(crate) struct ObserverList<T: ?Sized> {
    observers: Vec<Arc<T>>,
}

impl<T: ?Sized> ObserverList<T> {
    pub(crate) fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Add an observer. Returns `Ok(false)` if it was already registered and
    /// `Err(())` if the list is full.
    pub(crate) fn register(&mut self, observer: Arc<T>) -> Result<bool, ()> {
        if self.observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return Ok(false);
        }
        if self.observers.len() >= MAX_OBSERVERS {
            return Err(());
        }
        self.observers.push(observer);
        Ok(true)
    }

    pub(crate) fn unregister(&mut self, observer: &Arc<T>) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| !Arc::ptr_eq(o, observer));
        self.observers.len() != before
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.observers.iter().map(|o| o.as_ref())
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }
}
