//! Biometric data model and series storage for TwinWatch.
//!
//! `twin-biometrics` provides the measurement types that flow through the
//! rule-evaluation pipeline:
//!
//! - [`BiometricDataPoint`]: one timestamped measurement for a patient
//! - [`BiometricKind`]: the enumerated physiological/behavioral signals
//! - [`BiometricSource`]: the read-side trait the engine evaluates against
//! - [`SeriesStore`]: a thread-safe, retention-bounded in-memory source
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use twin_biometrics::{
//!     BiometricDataPoint, BiometricKind, BiometricSource, BiometricValue, PatientId, SeriesStore,
//! };
//!
//! let store = SeriesStore::new(Duration::from_secs(72 * 3600));
//! let patient = PatientId::new();
//!
//! let point = BiometricDataPoint::new(
//!     patient,
//!     BiometricKind::HeartRate,
//!     BiometricValue::Numeric(72.0),
//!     "wearable-01",
//! );
//! store.record(point).unwrap();
//!
//! let latest = store.latest_point(patient, BiometricKind::HeartRate).unwrap();
//! assert!(latest.is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod source;
pub mod store;
pub mod types;

pub use error::{BiometricsError, Result};
pub use source::BiometricSource;
pub use store::SeriesStore;
pub use types::{BiometricDataPoint, BiometricKind, BiometricValue, PatientId};
