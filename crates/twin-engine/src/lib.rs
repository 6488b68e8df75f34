//! The TwinWatch evaluation pipeline.
//!
//! `twin-engine` wires the other crates into a running system:
//!
//! - [`RuleEvaluator`]: fetches condition windows and combines condition
//!   results with the rule's logical operator
//! - [`AlertFactory`]: renders matched rules into NEW alerts
//! - [`Deduplicator`]: suppresses matches while an open alert exists
//! - [`IngestionCoordinator`]: per-patient serialized ingestion, lifecycle
//!   entry points, and observer fan-out
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use twin_alerts::{MemoryAlertRepository, ObserverRegistry};
//! use twin_biometrics::SeriesStore;
//! use twin_engine::{EngineConfig, IngestionCoordinator};
//! use twin_rules::RuleCatalog;
//!
//! let coordinator = IngestionCoordinator::new(
//!     Arc::new(SeriesStore::default()),
//!     Arc::new(RuleCatalog::new()),
//!     Arc::new(MemoryAlertRepository::new()),
//!     ObserverRegistry::new(),
//!     EngineConfig::default(),
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod coordinator;
pub mod dedup;
pub mod error;
pub mod evaluator;
pub mod factory;

pub use coordinator::{CycleOutcome, EngineConfig, IngestionCoordinator};
pub use dedup::Deduplicator;
pub use error::{EngineError, Result};
pub use evaluator::{ConditionOutcome, RuleEvaluator, RuleMatch};
pub use factory::AlertFactory;
