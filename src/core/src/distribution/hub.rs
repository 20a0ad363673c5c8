use log::{debug, info, trace};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::types::FeedEvent;
use crate::name_resolution::cache::CacheNotifier;
use crate::name_resolution::types::HostEntry;
use crate::session_management::correlator::SessionCorrelator;
use crate::session_management::session::Session;

/// Receiving end handed to one observer.
///
/// Dropping it is enough to unsubscribe; the next publish notices the closed
/// channel and removes the registration.
pub struct Observer {
    pub id: Uuid,
    receiver: mpsc::Receiver<FeedEvent>,
}

impl Observer {
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<FeedEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Publish/subscribe registry of connected observers.
///
/// Delivery is best effort and immediate, there is no batching and no replay.
/// An observer whose buffer is full loses that message only; one that went
/// away is unregistered. Neither affects the other observers.
pub struct LiveDistributionHub {
    observers: Mutex<HashMap<Uuid, mpsc::Sender<FeedEvent>>>,
    correlator: Arc<SessionCorrelator>,
    buffer: usize,
}

impl LiveDistributionHub {
    pub fn new(correlator: Arc<SessionCorrelator>, buffer: usize) -> Self {
        Self {
            observers: Mutex::new(HashMap::new()),
            correlator,
            buffer: buffer.max(1),
        }
    }

    fn observers(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::Sender<FeedEvent>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> Observer {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        let mut observers = self.observers();
        observers.insert(id, sender);
        info!("Observer {} connected ({} total)", id, observers.len());
        Observer { id, receiver }
    }

    pub fn unsubscribe(&self, id: Uuid) {
        let mut observers = self.observers();
        if observers.remove(&id).is_some() {
            info!("Observer {} disconnected ({} left)", id, observers.len());
        }
    }

    /// Delivers `event` to every registered observer, returns how many got it.
    pub fn publish(&self, event: FeedEvent) -> usize {
        let mut observers = self.observers();
        let mut delivered = 0;
        let mut gone = Vec::new();

        for (id, sender) in observers.iter() {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!("Observer {} is lagging, message dropped", id);
                }
                Err(TrySendError::Closed(_)) => gone.push(*id),
            }
        }

        for id in gone {
            observers.remove(&id);
            debug!("Observer {} went away", id);
        }

        trace!("Event delivered to {} observers", delivered);
        delivered
    }

    pub fn publish_session(&self, session: Session) -> usize {
        self.publish(FeedEvent::SessionUpdate(session))
    }

    pub fn publish_cache_update(&self, entry: HostEntry) -> usize {
        self.publish(FeedEvent::CacheUpdate(entry))
    }

    /// Current sessions for an observer that just joined.
    pub fn snapshot(&self) -> Vec<Session> {
        self.correlator.snapshot()
    }

    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }
}

impl CacheNotifier for LiveDistributionHub {
    fn hostname_changed(&self, entry: &HostEntry) {
        self.publish_cache_update(entry.clone());
    }
}
