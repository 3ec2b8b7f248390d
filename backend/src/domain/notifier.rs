//! Change notifications for views that cache store state.
//!
//! The store itself never emits; `BudgetApp` emits after a mutation has been
//! applied and persisted.

use log::{debug, error};
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// A different profile is now active
    ProfileChanged { profile_id: String },
    ProfileRenamed { profile_id: String, name: String },
    /// Cached per-profile state must be dropped
    StateReset,
    CategoriesChanged,
    BudgetUpdated { category: String },
    ExpensesChanged,
    SettingsChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&StateEvent)>;

#[derive(Default)]
pub struct StateNotifier {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl StateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl Fn(&StateEvent) + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver `event` to every listener in subscription order.
    /// A listener that panics is logged and skipped.
    pub fn emit(&self, event: StateEvent) {
        debug!("Emitting {:?} to {} listeners", event, self.listeners.len());

        for (id, listener) in &self.listeners {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| listener(&event)));
            if delivered.is_err() {
                error!("Listener {:?} panicked while handling {:?}", id, event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(notifier: &mut StateNotifier) -> (SubscriptionId, Rc<RefCell<Vec<StateEvent>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = notifier.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        (id, seen)
    }

    #[test]
    fn test_events_reach_every_listener_in_order() {
        let mut notifier = StateNotifier::new();
        let (_, first) = recorder(&mut notifier);
        let (_, second) = recorder(&mut notifier);

        notifier.emit(StateEvent::StateReset);
        notifier.emit(StateEvent::ExpensesChanged);

        let expected = vec![StateEvent::StateReset, StateEvent::ExpensesChanged];
        assert_eq!(*first.borrow(), expected);
        assert_eq!(*second.borrow(), expected);
    }

    #[test]
    fn test_unsubscribe() {
        let mut notifier = StateNotifier::new();
        let (id, seen) = recorder(&mut notifier);

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.emit(StateEvent::CategoriesChanged);

        assert!(seen.borrow().is_empty());
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let mut notifier = StateNotifier::new();
        notifier.subscribe(|_| panic!("listener failure"));
        let (_, seen) = recorder(&mut notifier);

        notifier.emit(StateEvent::SettingsChanged);

        assert_eq!(*seen.borrow(), vec![StateEvent::SettingsChanged]);
    }
}
