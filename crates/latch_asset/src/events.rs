//! Load completion notifications

use crate::ResourceId;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEvent {
    /// Construction finished; the resource can be bound into use.
    Loaded(ResourceId),
    Failed { id: ResourceId, reason: String },
}

impl ResourceEvent {
    pub fn id(&self) -> ResourceId {
        match self {
            ResourceEvent::Loaded(id) | ResourceEvent::Failed { id, .. } => *id,
        }
    }
}

/// Fan-out of events to every live subscriber.
#[derive(Default)]
pub(crate) struct EventBus {
    subscribers: Mutex<Vec<Sender<ResourceEvent>>>,
}

impl EventBus {
    pub(crate) fn subscribe(&self) -> Receiver<ResourceEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Send to every subscriber, forgetting the ones that hung up.
    pub(crate) fn publish(&self, event: ResourceEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Watches a set of resources and reports when any of them finished loading.
///
/// Meant to be polled once per frame by a system that rebuilds GPU state when
/// its inputs change.
pub struct ResourceSink {
    events: Receiver<ResourceEvent>,
    watched: HashSet<ResourceId>,
}

impl ResourceSink {
    pub fn new(events: Receiver<ResourceEvent>) -> Self {
        Self {
            events,
            watched: HashSet::new(),
        }
    }

    pub fn watch(&mut self, id: ResourceId) {
        self.watched.insert(id);
    }

    pub fn unwatch(&mut self, id: ResourceId) {
        self.watched.remove(&id);
    }

    pub fn is_watching(&self, id: ResourceId) -> bool {
        self.watched.contains(&id)
    }

    /// Drain pending events; true if a watched resource loaded since the last poll.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        for event in self.events.try_iter() {
            if let ResourceEvent::Loaded(id) = event {
                changed |= self.watched.contains(&id);
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_sees_every_event() {
        let bus = EventBus::default();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(ResourceEvent::Loaded(ResourceId::from_raw(1)));
        assert_eq!(a.try_recv().unwrap(), ResourceEvent::Loaded(ResourceId::from_raw(1)));
        assert_eq!(b.try_recv().unwrap().id(), ResourceId::from_raw(1));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = EventBus::default();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.publish(ResourceEvent::Loaded(ResourceId::from_raw(2)));
        assert_eq!(bus.subscribers.lock().len(), 1);
        assert!(kept.try_recv().is_ok());
    }

    #[test]
    fn sink_reports_watched_loads_once() {
        let bus = EventBus::default();
        let mut sink = ResourceSink::new(bus.subscribe());
        let skybox = ResourceId::from_raw(10);
        sink.watch(skybox);

        bus.publish(ResourceEvent::Loaded(ResourceId::from_raw(11)));
        assert!(!sink.poll());

        bus.publish(ResourceEvent::Failed {
            id: skybox,
            reason: "decode".into(),
        });
        assert!(!sink.poll());

        bus.publish(ResourceEvent::Loaded(skybox));
        assert!(sink.poll());
        assert!(!sink.poll());
    }
}
