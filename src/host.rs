//! Host element abstraction
//!
//! A [`HostElement`] stands in for the on-screen element a drawing engine
//! attaches to: it carries the current client dimensions, enforces the
//! one-engine-per-host ownership rule, and fans viewport-resize events out to
//! subscribers through per-subscription queues that are drained cooperatively
//! on the consumer's event loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{Error, Result, Viewport};

type ResizeQueue = Arc<Mutex<VecDeque<Viewport>>>;

struct HostShared {
    width: u32,
    height: u32,
    bound: bool,
    next_subscription: u64,
    subscribers: Vec<(u64, ResizeQueue)>,
}

/// Handle to a drawable host area. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct HostElement {
    shared: Arc<Mutex<HostShared>>,
}

impl HostElement {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            shared: Arc::new(Mutex::new(HostShared {
                width,
                height,
                bound: false,
                next_subscription: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, HostShared> {
        // Recover the inner state on poisoning; host bookkeeping must stay
        // usable even after a panicked subscriber.
        self.shared.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Current client dimensions
    pub fn client_size(&self) -> Viewport {
        let s = self.state();
        Viewport {
            width: s.width,
            height: s.height,
        }
    }

    /// Record a new client size and queue a resize event for every
    /// subscriber. Events are delivered when subscribers next drain their
    /// queue, so they may arrive at any point of a session, including while
    /// a background load is still pending.
    pub fn set_client_size(&self, width: u32, height: u32) {
        let viewport = Viewport { width, height };
        let mut s = self.state();
        s.width = width;
        s.height = height;
        for (_, queue) in &s.subscribers {
            if let Ok(mut q) = queue.lock() {
                q.push_back(viewport);
            }
        }
        log::debug!("host resized to {}x{}", width, height);
    }

    /// Whether an engine currently owns this host's paint surface
    pub fn is_bound(&self) -> bool {
        self.state().bound
    }

    /// Number of live resize subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }

    /// Claim exclusive ownership of the paint surface. The returned guard
    /// releases the claim when dropped.
    pub(crate) fn bind_engine(&self) -> Result<HostBinding> {
        let mut s = self.state();
        if s.bound {
            return Err(Error::EngineBinding(
                "host element already has a bound engine; release it first".to_string(),
            ));
        }
        s.bound = true;
        Ok(HostBinding { host: self.clone() })
    }

    fn release_engine(&self) {
        self.state().bound = false;
    }

    /// Register for resize events. Unsubscribes when the returned handle is
    /// dropped, whatever path drops it.
    pub fn subscribe_resize(&self) -> ResizeSubscription {
        let queue: ResizeQueue = Arc::new(Mutex::new(VecDeque::new()));
        let mut s = self.state();
        let id = s.next_subscription;
        s.next_subscription += 1;
        s.subscribers.push((id, Arc::clone(&queue)));
        drop(s);
        ResizeSubscription {
            id,
            queue,
            host: self.clone(),
        }
    }

    fn unsubscribe_resize(&self, id: u64) {
        self.state().subscribers.retain(|(sid, _)| *sid != id);
    }
}

/// Exclusive engine-ownership guard for a host element
pub(crate) struct HostBinding {
    host: HostElement,
}

impl Drop for HostBinding {
    fn drop(&mut self) {
        self.host.release_engine();
    }
}

/// A live resize-event subscription
///
/// Queued events are read with [`ResizeSubscription::next_event`]; dropping
/// the subscription removes it from the host's registry.
pub struct ResizeSubscription {
    id: u64,
    queue: ResizeQueue,
    host: HostElement,
}

impl ResizeSubscription {
    /// Pop the oldest undelivered resize event, if any.
    pub fn next_event(&self) -> Option<Viewport> {
        self.queue.lock().ok().and_then(|mut q| q.pop_front())
    }
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        self.host.unsubscribe_resize(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_is_exclusive_until_released() {
        let host = HostElement::new(640, 480);
        assert!(!host.is_bound());

        let guard = host.bind_engine().expect("first bind");
        assert!(host.is_bound());
        assert!(matches!(
            host.bind_engine(),
            Err(Error::EngineBinding(_))
        ));

        drop(guard);
        assert!(!host.is_bound());
        host.bind_engine().expect("rebind after release");
    }

    #[test]
    fn resize_events_queue_per_subscriber() {
        let host = HostElement::new(640, 480);
        let sub = host.subscribe_resize();
        assert_eq!(host.subscriber_count(), 1);
        assert!(sub.next_event().is_none());

        host.set_client_size(1024, 768);
        host.set_client_size(300, 200);
        assert_eq!(
            sub.next_event(),
            Some(Viewport {
                width: 1024,
                height: 768
            })
        );
        assert_eq!(
            sub.next_event(),
            Some(Viewport {
                width: 300,
                height: 200
            })
        );
        assert!(sub.next_event().is_none());
        assert_eq!(host.client_size().width, 300);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let host = HostElement::new(640, 480);
        let sub = host.subscribe_resize();
        let other = host.subscribe_resize();
        assert_eq!(host.subscriber_count(), 2);
        drop(sub);
        assert_eq!(host.subscriber_count(), 1);
        drop(other);
        assert_eq!(host.subscriber_count(), 0);
    }
}
