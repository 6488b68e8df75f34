//! Observer fan-out for alert lifecycle events.
//!
//! Observers register interest in a specific [`AlertEvent`] kind. Fan-out
//! iterates over a snapshot of the registered list so observers may attach
//! or detach concurrently, and one failing observer never prevents
//! delivery to the rest.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use twin_rules::AlertPriority;

use crate::alert::BiometricAlert;
use crate::error::Result;

/// The lifecycle event kinds an observer can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertEvent {
    /// A new alert was raised.
    Created,
    /// An alert was acknowledged by a care-team member.
    Acknowledged,
    /// An alert was resolved.
    Resolved,
    /// An alert was dismissed as not actionable.
    Dismissed,
}

impl AlertEvent {
    /// Returns the event kind as a lowercase string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }
}

impl std::fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A sink for alert lifecycle notifications.
///
/// Implementations must be cheap enough to call inline from the ingestion
/// path, or hand off internally to their own queue.
pub trait AlertObserver: Send + Sync {
    /// A stable name for this observer, used in logs and for detachment.
    fn name(&self) -> &str;

    /// Delivers one event for one alert.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery failed. Failures are logged and
    /// counted but never propagate to other observers.
    fn notify(&self, event: AlertEvent, alert: &BiometricAlert) -> Result<()>;
}

/// The result of fanning one event out to all subscribed observers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutOutcome {
    /// Observers that accepted the notification.
    pub delivered: usize,
    /// Observers that returned an error.
    pub failed: usize,
}

type ObserverLists = HashMap<AlertEvent, Vec<Arc<dyn AlertObserver>>>;

/// Per-event-kind observer lists with snapshot fan-out.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Arc<RwLock<ObserverLists>>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes an observer to an event kind.
    pub fn attach(&self, event: AlertEvent, observer: Arc<dyn AlertObserver>) {
        let mut observers = self.observers.write();
        observers.entry(event).or_default().push(observer);
    }

    /// Removes all observers with the given name from an event kind.
    ///
    /// Returns the number of observers removed.
    pub fn detach(&self, event: AlertEvent, name: &str) -> usize {
        let mut observers = self.observers.write();
        let Some(list) = observers.get_mut(&event) else {
            return 0;
        };
        let before = list.len();
        list.retain(|o| o.name() != name);
        before - list.len()
    }

    /// Returns the number of observers subscribed to an event kind.
    #[must_use]
    pub fn observer_count(&self, event: AlertEvent) -> usize {
        let observers = self.observers.read();
        observers.get(&event).map_or(0, Vec::len)
    }

    /// Delivers an event to every subscribed observer.
    ///
    /// Iterates over a snapshot taken under the read lock, so observers
    /// may attach or detach while fan-out is in flight. A failing
    /// observer is logged and counted; the remaining observers still
    /// receive the event.
    pub fn notify(&self, event: AlertEvent, alert: &BiometricAlert) -> FanoutOutcome {
        let snapshot: Vec<Arc<dyn AlertObserver>> = {
            let observers = self.observers.read();
            observers.get(&event).cloned().unwrap_or_default()
        };

        let mut outcome = FanoutOutcome::default();
        for observer in snapshot {
            match observer.notify(event, alert) {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    outcome.failed += 1;
                    warn!(
                        observer = observer.name(),
                        alert_id = %alert.id,
                        event = %event,
                        error = %e,
                        "observer notification failed"
                    );
                }
            }
        }
        outcome
    }
}

impl Clone for ObserverRegistry {
    fn clone(&self) -> Self {
        Self {
            observers: Arc::clone(&self.observers),
        }
    }
}

/// An observer that logs alerts through `tracing` at a level matched to
/// the alert's priority.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl TracingObserver {
    /// Creates a tracing observer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AlertObserver for TracingObserver {
    fn name(&self) -> &str {
        "tracing"
    }

    fn notify(&self, event: AlertEvent, alert: &BiometricAlert) -> Result<()> {
        match alert.priority {
            AlertPriority::Informational | AlertPriority::Warning => info!(
                alert_id = %alert.id,
                patient_id = %alert.patient_id,
                event = %event,
                priority = ?alert.priority,
                "{}",
                alert.description
            ),
            AlertPriority::Urgent => warn!(
                alert_id = %alert.id,
                patient_id = %alert.patient_id,
                event = %event,
                priority = ?alert.priority,
                "{}",
                alert.description
            ),
            AlertPriority::Critical => error!(
                alert_id = %alert.id,
                patient_id = %alert.patient_id,
                event = %event,
                priority = ?alert.priority,
                "{}",
                alert.description
            ),
        }
        Ok(())
    }
}
