//! Clinical alerts for TwinWatch.
//!
//! `twin-alerts` provides the output side of the rule engine:
//!
//! - [`BiometricAlert`]: the clinically-actionable event raised when a rule
//!   matches, with a monotonic status state machine
//! - [`AlertRepository`]: the persistence seam, with an in-memory
//!   implementation whose conditional save backstops deduplication
//! - [`AlertLifecycle`]: acknowledge / resolve / dismiss entry points
//! - [`ObserverRegistry`]: per-event-kind observer lists with snapshot
//!   fan-out and per-observer failure isolation
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use twin_alerts::{AlertEvent, AlertLifecycle, MemoryAlertRepository, ObserverRegistry, TracingObserver};
//!
//! let repository = Arc::new(MemoryAlertRepository::new());
//! let lifecycle = AlertLifecycle::new(repository);
//!
//! let registry = ObserverRegistry::new();
//! registry.attach(AlertEvent::Created, Arc::new(TracingObserver::new()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod alert;
pub mod error;
pub mod lifecycle;
pub mod observer;
pub mod repository;

pub use alert::{AlertId, AlertStatus, BiometricAlert};
pub use error::{AlertError, Result};
pub use lifecycle::AlertLifecycle;
pub use observer::{AlertEvent, AlertObserver, FanoutOutcome, ObserverRegistry, TracingObserver};
pub use repository::{AlertRepository, MemoryAlertRepository};
