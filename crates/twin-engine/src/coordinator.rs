//! Per-patient serialized ingestion over the evaluation pipeline.
//!
//! Each patient gets a dedicated worker task fed by a bounded channel, so
//! evaluation cycles for one patient never overlap and the open-alert
//! dedup check is race-free. Different patients evaluate concurrently.
//! Observer fan-out happens on a detached task so a slow observer never
//! stalls ingestion.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use twin_alerts::{
    AlertEvent, AlertError, AlertId, AlertLifecycle, AlertRepository, BiometricAlert,
    ObserverRegistry,
};
use twin_biometrics::{BiometricDataPoint, BiometricSource, PatientId, SeriesStore};
use twin_rules::RuleRepository;

use crate::dedup::Deduplicator;
use crate::error::{EngineError, Result};
use crate::evaluator::RuleEvaluator;
use crate::factory::AlertFactory;

/// Default bound on each patient's ingestion queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Default deadline for evaluating a single rule.
pub const DEFAULT_EVALUATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity of each per-patient ingestion queue.
    pub queue_depth: usize,
    /// Deadline for evaluating a single rule.
    pub evaluation_timeout: Duration,
    /// Whether acknowledge/resolve/dismiss also notify observers.
    pub notify_on_lifecycle: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            evaluation_timeout: DEFAULT_EVALUATION_TIMEOUT,
            notify_on_lifecycle: true,
        }
    }
}

/// What one evaluation cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Rules fetched and evaluated for the patient.
    pub rules_evaluated: usize,
    /// Rules that errored or timed out.
    pub rules_errored: usize,
    /// Alerts raised this cycle.
    pub alerts_raised: usize,
    /// Matches suppressed by an existing open alert.
    pub suppressed: usize,
}

/// Everything one evaluation cycle needs, shared across worker tasks.
struct Pipeline {
    store: Arc<SeriesStore>,
    rules: Arc<dyn RuleRepository>,
    repository: Arc<dyn AlertRepository>,
    evaluator: Arc<RuleEvaluator>,
    factory: AlertFactory,
    dedup: Deduplicator,
    registry: ObserverRegistry,
    config: EngineConfig,
}

impl Pipeline {
    /// Runs one full cycle: record, evaluate, dedup, raise, notify.
    async fn process(&self, point: BiometricDataPoint) -> Result<CycleOutcome> {
        let patient_id = point.patient_id;
        self.store.record(point)?;

        let rules = self.rules.active_rules_for(patient_id)?;
        let mut outcome = CycleOutcome {
            rules_evaluated: rules.len(),
            ..CycleOutcome::default()
        };

        for rule in rules {
            let evaluator = Arc::clone(&self.evaluator);
            let rule_for_eval = rule.clone();
            let evaluation = timeout(
                self.config.evaluation_timeout,
                tokio::task::spawn_blocking(move || {
                    evaluator.evaluate(&rule_for_eval, patient_id)
                }),
            )
            .await;

            let rule_match = match evaluation {
                Err(_) => {
                    outcome.rules_errored += 1;
                    let e = EngineError::EvaluationTimeout {
                        rule_id: rule.id.to_string(),
                    };
                    warn!(
                        rule_id = %rule.id,
                        patient_id = %patient_id,
                        error = %e,
                        "rule evaluation timed out"
                    );
                    continue;
                }
                Ok(Err(join_error)) => {
                    outcome.rules_errored += 1;
                    error!(
                        rule_id = %rule.id,
                        patient_id = %patient_id,
                        error = %join_error,
                        "rule evaluation task failed"
                    );
                    continue;
                }
                Ok(Ok(Err(e))) => {
                    outcome.rules_errored += 1;
                    error!(
                        rule_id = %rule.id,
                        patient_id = %patient_id,
                        error = %e,
                        "rule evaluation failed"
                    );
                    continue;
                }
                Ok(Ok(Ok(rule_match))) => rule_match,
            };

            if !rule_match.matched {
                continue;
            }

            if self.dedup.suppresses(patient_id, rule.id)? {
                outcome.suppressed += 1;
                continue;
            }

            let alert = self.factory.create(&rule, patient_id, &rule_match);
            match self.repository.save(&alert) {
                Ok(()) => {
                    outcome.alerts_raised += 1;
                    info!(
                        alert_id = %alert.id,
                        rule_id = %rule.id,
                        patient_id = %patient_id,
                        priority = ?alert.priority,
                        "alert raised"
                    );
                    self.notify_detached(AlertEvent::Created, alert);
                }
                Err(AlertError::DuplicateOpenAlert { .. }) => {
                    outcome.suppressed += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        debug!(
            patient_id = %patient_id,
            rules_evaluated = outcome.rules_evaluated,
            alerts_raised = outcome.alerts_raised,
            suppressed = outcome.suppressed,
            "evaluation cycle complete"
        );
        Ok(outcome)
    }

    /// Fans an event out on its own task.
    fn notify_detached(&self, event: AlertEvent, alert: BiometricAlert) {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            registry.notify(event, &alert);
        });
    }
}

/// Accepts biometric data points and drives the evaluation pipeline.
pub struct IngestionCoordinator {
    pipeline: Arc<Pipeline>,
    lifecycle: AlertLifecycle,
    workers: Arc<RwLock<HashMap<PatientId, mpsc::Sender<BiometricDataPoint>>>>,
}

impl IngestionCoordinator {
    /// Creates a coordinator over the given stores and observer registry.
    #[must_use]
    pub fn new(
        store: Arc<SeriesStore>,
        rules: Arc<dyn RuleRepository>,
        repository: Arc<dyn AlertRepository>,
        registry: ObserverRegistry,
        config: EngineConfig,
    ) -> Self {
        let evaluator = Arc::new(RuleEvaluator::new(
            Arc::clone(&store) as Arc<dyn BiometricSource>
        ));
        let pipeline = Arc::new(Pipeline {
            store,
            rules,
            evaluator,
            factory: AlertFactory::new(),
            dedup: Deduplicator::new(Arc::clone(&repository)),
            repository: Arc::clone(&repository),
            registry,
            config,
        });
        Self {
            pipeline,
            lifecycle: AlertLifecycle::new(repository),
            workers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Enqueues a data point for the patient's worker.
    ///
    /// The first point for a patient spawns that patient's worker task.
    /// Points for the same patient are processed strictly in enqueue
    /// order; points for different patients proceed concurrently.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Ingest` if the patient's queue is closed.
    pub async fn ingest(&self, point: BiometricDataPoint) -> Result<()> {
        let sender = self.worker_for(point.patient_id);
        sender
            .send(point)
            .await
            .map_err(|_| EngineError::Ingest {
                reason: "patient worker queue closed".to_string(),
            })
    }

    /// Runs one evaluation cycle inline, bypassing the worker queue.
    ///
    /// Callers that need the cycle's outcome synchronously (backfill
    /// jobs, tests) use this; live ingestion goes through [`ingest`].
    ///
    /// [`ingest`]: Self::ingest
    ///
    /// # Errors
    ///
    /// Returns an error if any pipeline stage fails.
    pub async fn process(&self, point: BiometricDataPoint) -> Result<CycleOutcome> {
        self.pipeline.process(point).await
    }

    /// Acknowledges an alert and notifies observers if configured.
    ///
    /// # Errors
    ///
    /// Propagates lifecycle errors from the alert store.
    pub fn acknowledge(
        &self,
        alert_id: AlertId,
        user_id: impl Into<String>,
    ) -> Result<BiometricAlert> {
        let alert = self.lifecycle.acknowledge(alert_id, user_id)?;
        self.notify_lifecycle(AlertEvent::Acknowledged, &alert);
        Ok(alert)
    }

    /// Resolves an acknowledged alert and notifies observers if configured.
    ///
    /// # Errors
    ///
    /// Propagates lifecycle errors from the alert store.
    pub fn resolve(
        &self,
        alert_id: AlertId,
        user_id: impl Into<String>,
        notes: Option<String>,
    ) -> Result<BiometricAlert> {
        let alert = self.lifecycle.resolve(alert_id, user_id, notes)?;
        self.notify_lifecycle(AlertEvent::Resolved, &alert);
        Ok(alert)
    }

    /// Dismisses a NEW alert and notifies observers if configured.
    ///
    /// # Errors
    ///
    /// Propagates lifecycle errors from the alert store.
    pub fn dismiss(
        &self,
        alert_id: AlertId,
        user_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<BiometricAlert> {
        let alert = self.lifecycle.dismiss(alert_id, user_id, reason)?;
        self.notify_lifecycle(AlertEvent::Dismissed, &alert);
        Ok(alert)
    }

    /// Drops all worker queues; in-flight points finish, then workers exit.
    pub fn shutdown(&self) {
        let mut workers = self.workers.write();
        workers.clear();
    }

    /// Number of patients with a live worker.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        let workers = self.workers.read();
        workers.len()
    }

    fn worker_for(&self, patient_id: PatientId) -> mpsc::Sender<BiometricDataPoint> {
        {
            let workers = self.workers.read();
            if let Some(sender) = workers.get(&patient_id) {
                return sender.clone();
            }
        }

        let mut workers = self.workers.write();
        // Another caller may have won the race between the locks.
        if let Some(sender) = workers.get(&patient_id) {
            return sender.clone();
        }

        // A zero depth would panic in mpsc::channel; treat it as 1.
        let (tx, rx) = mpsc::channel(self.pipeline.config.queue_depth.max(1));
        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(run_worker(pipeline, patient_id, rx));
        debug!(patient_id = %patient_id, "spawned patient worker");
        workers.insert(patient_id, tx.clone());
        tx
    }

    fn notify_lifecycle(&self, event: AlertEvent, alert: &BiometricAlert) {
        if self.pipeline.config.notify_on_lifecycle {
            self.pipeline.registry.notify(event, alert);
        }
    }
}

async fn run_worker(
    pipeline: Arc<Pipeline>,
    patient_id: PatientId,
    mut rx: mpsc::Receiver<BiometricDataPoint>,
) {
    while let Some(point) = rx.recv().await {
        if let Err(e) = pipeline.process(point).await {
            error!(patient_id = %patient_id, error = %e, "evaluation cycle failed");
        }
    }
    debug!(patient_id = %patient_id, "patient worker stopped");
}
