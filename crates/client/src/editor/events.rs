//! Editor event bus.
//!
//! Push-based: subscribers register callbacks that run synchronously for
//! every published event. Each bus belongs to one editor session. A
//! subscription lasts until its [`Subscription`] handle is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use compass_domain::{ComponentId, ComponentType};

use super::camera::Point;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    ComponentCreated(ComponentId),
    ComponentsRemoved(Vec<ComponentId>),
    SelectionChanged(Vec<ComponentId>),
    PlacingTypeChanged(Option<ComponentType>),
    CameraChanged { zoom: f64, pan: Point },
}

type Callback = Box<dyn FnMut(&EditorEvent) + Send + 'static>;

struct Listener {
    id: u64,
    active: AtomicBool,
    callback: Mutex<Callback>,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    listeners: Vec<Arc<Listener>>,
}

#[derive(Clone, Default)]
pub struct EditorEventBus {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl EditorEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for every event.
    ///
    /// Callbacks may subscribe and drop subscriptions (their own included)
    /// but must not publish on the same bus.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl FnMut(&EditorEvent) + Send + 'static) -> Subscription {
        let mut subscribers = self.lock();
        subscribers.next_id += 1;
        let id = subscribers.next_id;
        subscribers.listeners.push(Arc::new(Listener {
            id,
            active: AtomicBool::new(true),
            callback: Mutex::new(Box::new(callback)),
        }));

        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Deliver `event` to a snapshot of the current subscribers. The bus
    /// lock is released before any callback runs.
    pub fn publish(&self, event: EditorEvent) {
        let listeners = self.lock().listeners.clone();
        for listener in listeners {
            if !listener.active.load(Ordering::Acquire) {
                continue;
            }
            let mut callback = listener
                .callback
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            callback(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Subscribers> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Unsubscribes on drop.
pub struct Subscription {
    id: u64,
    subscribers: Weak<Mutex<Subscribers>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Bus already gone: nothing to detach from.
        let Some(subscribers) = self.subscribers.upgrade() else {
            return;
        };
        let removed: Vec<Arc<Listener>> = {
            let mut subscribers = subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            let (removed, kept) = std::mem::take(&mut subscribers.listeners)
                .into_iter()
                .partition(|listener| listener.id == self.id);
            subscribers.listeners = kept;
            removed
        };
        for listener in removed {
            listener.active.store(false, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &EditorEventBus) -> (Subscription, Arc<Mutex<Vec<EditorEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        (subscription, seen)
    }

    #[test]
    fn dropping_the_subscription_stops_delivery() {
        let bus = EditorEventBus::new();
        let (subscription, seen) = recorder(&bus);

        bus.publish(EditorEvent::PlacingTypeChanged(Some(ComponentType::Text)));
        drop(subscription);
        bus.publish(EditorEvent::PlacingTypeChanged(None));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EditorEvent::PlacingTypeChanged(Some(ComponentType::Text))]
        );
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn buses_are_independent() {
        let first = EditorEventBus::new();
        let second = EditorEventBus::new();
        let (_keep, seen) = recorder(&first);

        second.publish(EditorEvent::SelectionChanged(Vec::new()));

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(first.subscriber_count(), 1);
    }

    #[test]
    fn subscription_outliving_the_bus_drops_cleanly() {
        let bus = EditorEventBus::new();
        let (subscription, _) = recorder(&bus);
        drop(bus);
        drop(subscription);
    }

    #[test]
    fn callback_can_drop_its_own_subscription() {
        let bus = EditorEventBus::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(0));

        let subscription = bus.subscribe({
            let slot = slot.clone();
            let calls = calls.clone();
            move |_| {
                *calls.lock().unwrap() += 1;
                slot.lock().unwrap().take();
            }
        });
        *slot.lock().unwrap() = Some(subscription);

        bus.publish(EditorEvent::SelectionChanged(Vec::new()));
        bus.publish(EditorEvent::SelectionChanged(Vec::new()));

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribed_mid_publish_is_not_called() {
        let bus = EditorEventBus::new();
        let target: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let _dropper = bus.subscribe({
            let target = target.clone();
            move |_| {
                target.lock().unwrap().take();
            }
        });
        let (subscription, seen) = recorder(&bus);
        *target.lock().unwrap() = Some(subscription);

        bus.publish(EditorEvent::PlacingTypeChanged(None));

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn callback_can_subscribe_another() {
        let bus = EditorEventBus::new();
        let spawned: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));
        let _parent = bus.subscribe({
            let bus = bus.clone();
            let spawned = spawned.clone();
            move |_| spawned.lock().unwrap().push(bus.subscribe(|_| {}))
        });

        bus.publish(EditorEvent::SelectionChanged(Vec::new()));
        assert_eq!(bus.subscriber_count(), 2);
    }
}
