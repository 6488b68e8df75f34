//! End-to-end pipeline tests: ingest, evaluate, dedup, lifecycle, fan-out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use twin_alerts::{
    AlertEvent, AlertObserver, AlertRepository, AlertStatus, BiometricAlert,
    MemoryAlertRepository, ObserverRegistry,
};
use twin_biometrics::{
    BiometricDataPoint, BiometricKind, BiometricValue, PatientId, SeriesStore,
};
use twin_engine::{EngineConfig, IngestionCoordinator};
use twin_rules::{
    AlertPriority, BiometricRule, ComparisonOperator, LogicalOperator, ProviderId,
    RuleCatalog, RuleCondition,
};

struct Harness {
    coordinator: IngestionCoordinator,
    catalog: Arc<RuleCatalog>,
    repository: Arc<MemoryAlertRepository>,
    registry: ObserverRegistry,
}

fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let catalog = Arc::new(RuleCatalog::new());
    let repository = Arc::new(MemoryAlertRepository::new());
    let registry = ObserverRegistry::new();
    let coordinator = IngestionCoordinator::new(
        Arc::new(SeriesStore::default()),
        Arc::clone(&catalog) as Arc<dyn twin_rules::RuleRepository>,
        Arc::clone(&repository) as Arc<dyn AlertRepository>,
        registry.clone(),
        EngineConfig::default(),
    );
    Harness {
        coordinator,
        catalog,
        repository,
        registry,
    }
}

fn tachycardia_rule(patient: PatientId) -> BiometricRule {
    BiometricRule::builder("Tachycardia", ProviderId::new())
        .description("Sustained elevated heart rate")
        .condition(
            RuleCondition::new(
                BiometricKind::HeartRate,
                ComparisonOperator::GreaterThanOrEqual,
                120.0,
            )
            .unwrap(),
        )
        .priority(AlertPriority::Warning)
        .patient(patient)
        .build()
        .unwrap()
}

fn hr_point(patient: PatientId, bpm: f64) -> BiometricDataPoint {
    BiometricDataPoint::new(
        patient,
        BiometricKind::HeartRate,
        BiometricValue::Numeric(bpm),
        "wearable",
    )
}

struct CountingObserver {
    name: String,
    received: AtomicUsize,
}

impl CountingObserver {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            received: AtomicUsize::new(0),
        })
    }

    fn count(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }
}

impl AlertObserver for CountingObserver {
    fn name(&self) -> &str {
        &self.name
    }

    fn notify(&self, _event: AlertEvent, _alert: &BiometricAlert) -> twin_alerts::Result<()> {
        self.received.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingObserver;

impl AlertObserver for FailingObserver {
    fn name(&self) -> &str {
        "failing"
    }

    fn notify(&self, _event: AlertEvent, _alert: &BiometricAlert) -> twin_alerts::Result<()> {
        Err(twin_alerts::AlertError::Notification {
            observer: "failing".to_string(),
            reason: "downstream unavailable".to_string(),
        })
    }
}

#[tokio::test]
async fn violation_raises_one_new_alert() {
    let h = harness();
    let patient = PatientId::new();
    h.catalog.add_rule(tachycardia_rule(patient)).unwrap();

    let outcome = h.coordinator.process(hr_point(patient, 125.0)).await.unwrap();

    assert_eq!(outcome.rules_evaluated, 1);
    assert_eq!(outcome.alerts_raised, 1);
    assert_eq!(outcome.suppressed, 0);

    let alerts = h.repository.alerts_for_patient(patient).unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status, AlertStatus::New);
    assert_eq!(alerts[0].alert_type, "Tachycardia");
    assert_eq!(alerts[0].data_points.len(), 1);
}

#[tokio::test]
async fn non_violating_point_raises_nothing() {
    let h = harness();
    let patient = PatientId::new();
    h.catalog.add_rule(tachycardia_rule(patient)).unwrap();

    let outcome = h.coordinator.process(hr_point(patient, 80.0)).await.unwrap();

    assert_eq!(outcome.alerts_raised, 0);
    assert!(h.repository.alerts_for_patient(patient).unwrap().is_empty());
}

#[tokio::test]
async fn open_alert_suppresses_repeat_violations() {
    let h = harness();
    let patient = PatientId::new();
    h.catalog.add_rule(tachycardia_rule(patient)).unwrap();

    h.coordinator.process(hr_point(patient, 125.0)).await.unwrap();
    let outcome = h.coordinator.process(hr_point(patient, 130.0)).await.unwrap();

    assert_eq!(outcome.alerts_raised, 0);
    assert_eq!(outcome.suppressed, 1);
    assert_eq!(h.repository.alerts_for_patient(patient).unwrap().len(), 1);
}

#[tokio::test]
async fn resolving_reopens_the_dedup_window() {
    let h = harness();
    let patient = PatientId::new();
    h.catalog.add_rule(tachycardia_rule(patient)).unwrap();

    h.coordinator.process(hr_point(patient, 125.0)).await.unwrap();
    let alert_id = h.repository.alerts_for_patient(patient).unwrap()[0].id;

    h.coordinator.acknowledge(alert_id, "dr-wells").unwrap();
    // Acknowledged alerts still suppress.
    let outcome = h.coordinator.process(hr_point(patient, 130.0)).await.unwrap();
    assert_eq!(outcome.suppressed, 1);

    h.coordinator
        .resolve(alert_id, "dr-wells", Some("patient contacted".to_string()))
        .unwrap();

    let outcome = h.coordinator.process(hr_point(patient, 128.0)).await.unwrap();
    assert_eq!(outcome.alerts_raised, 1);

    let alerts = h.repository.alerts_for_patient(patient).unwrap();
    assert_eq!(alerts.len(), 2);
    let second = alerts.iter().find(|a| a.id != alert_id).unwrap();
    assert_eq!(second.status, AlertStatus::New);
}

#[tokio::test]
async fn dismissal_also_reopens_the_dedup_window() {
    let h = harness();
    let patient = PatientId::new();
    h.catalog.add_rule(tachycardia_rule(patient)).unwrap();

    h.coordinator.process(hr_point(patient, 125.0)).await.unwrap();
    let alert_id = h.repository.alerts_for_patient(patient).unwrap()[0].id;

    h.coordinator
        .dismiss(alert_id, "dr-wells", "sensor artifact")
        .unwrap();

    let outcome = h.coordinator.process(hr_point(patient, 126.0)).await.unwrap();
    assert_eq!(outcome.alerts_raised, 1);
}

#[tokio::test]
async fn deactivated_rule_stops_raising() {
    let h = harness();
    let patient = PatientId::new();
    let rule = tachycardia_rule(patient);
    let rule_id = rule.id;
    h.catalog.add_rule(rule).unwrap();

    h.catalog.deactivate_rule(rule_id).unwrap();

    let outcome = h.coordinator.process(hr_point(patient, 125.0)).await.unwrap();
    assert_eq!(outcome.rules_evaluated, 0);
    assert_eq!(outcome.alerts_raised, 0);
}

#[tokio::test]
async fn alerts_are_scoped_to_the_bound_patient() {
    let h = harness();
    let alice = PatientId::new();
    let bob = PatientId::new();
    h.catalog.add_rule(tachycardia_rule(alice)).unwrap();

    h.coordinator.process(hr_point(bob, 180.0)).await.unwrap();

    assert!(h.repository.alerts_for_patient(bob).unwrap().is_empty());
    assert!(h.repository.alerts_for_patient(alice).unwrap().is_empty());
}

#[tokio::test]
async fn combined_and_rule_needs_both_signals() {
    let h = harness();
    let patient = PatientId::new();

    let rule = BiometricRule::builder("Agitation", ProviderId::new())
        .description("Elevated heart rate on short sleep")
        .condition(
            RuleCondition::new(BiometricKind::HeartRate, ComparisonOperator::GreaterThan, 100.0)
                .unwrap(),
        )
        .condition(
            RuleCondition::new(
                BiometricKind::SleepDuration,
                ComparisonOperator::LessThan,
                5.0,
            )
            .unwrap(),
        )
        .logical_operator(LogicalOperator::And)
        .priority(AlertPriority::Urgent)
        .patient(patient)
        .build()
        .unwrap();
    h.catalog.add_rule(rule).unwrap();

    // Heart rate alone is not enough.
    let outcome = h.coordinator.process(hr_point(patient, 110.0)).await.unwrap();
    assert_eq!(outcome.alerts_raised, 0);

    // A short-sleep reading completes the conjunction.
    let sleep = BiometricDataPoint::new(
        patient,
        BiometricKind::SleepDuration,
        BiometricValue::Numeric(4.0),
        "wearable",
    );
    let outcome = h.coordinator.process(sleep).await.unwrap();
    assert_eq!(outcome.alerts_raised, 1);

    let alerts = h.repository.alerts_for_patient(patient).unwrap();
    assert_eq!(alerts[0].priority, AlertPriority::Urgent);
    assert_eq!(alerts[0].data_points.len(), 2);
}

#[tokio::test]
async fn observer_failure_does_not_block_the_rest() {
    let h = harness();
    let patient = PatientId::new();
    h.catalog.add_rule(tachycardia_rule(patient)).unwrap();

    let first = CountingObserver::new("first");
    let last = CountingObserver::new("last");
    h.registry
        .attach(AlertEvent::Created, Arc::clone(&first) as Arc<dyn AlertObserver>);
    h.registry.attach(AlertEvent::Created, Arc::new(FailingObserver));
    h.registry
        .attach(AlertEvent::Created, Arc::clone(&last) as Arc<dyn AlertObserver>);

    h.coordinator.process(hr_point(patient, 125.0)).await.unwrap();

    // Fan-out runs on a detached task.
    tokio::time::timeout(Duration::from_secs(2), async {
        while first.count() == 0 || last.count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("observers were not notified in time");

    assert_eq!(first.count(), 1);
    assert_eq!(last.count(), 1);
}

#[tokio::test]
async fn lifecycle_events_reach_their_observers() {
    let h = harness();
    let patient = PatientId::new();
    h.catalog.add_rule(tachycardia_rule(patient)).unwrap();

    let acked = CountingObserver::new("acked");
    let resolved = CountingObserver::new("resolved");
    h.registry
        .attach(AlertEvent::Acknowledged, Arc::clone(&acked) as Arc<dyn AlertObserver>);
    h.registry
        .attach(AlertEvent::Resolved, Arc::clone(&resolved) as Arc<dyn AlertObserver>);

    h.coordinator.process(hr_point(patient, 125.0)).await.unwrap();
    let alert_id = h.repository.alerts_for_patient(patient).unwrap()[0].id;

    h.coordinator.acknowledge(alert_id, "dr-wells").unwrap();
    assert_eq!(acked.count(), 1);
    assert_eq!(resolved.count(), 0);

    h.coordinator.resolve(alert_id, "dr-wells", None).unwrap();
    assert_eq!(resolved.count(), 1);
}

#[tokio::test]
async fn queued_ingestion_processes_points_in_order() {
    let h = harness();
    let patient = PatientId::new();
    h.catalog.add_rule(tachycardia_rule(patient)).unwrap();

    h.coordinator.ingest(hr_point(patient, 125.0)).await.unwrap();
    h.coordinator.ingest(hr_point(patient, 130.0)).await.unwrap();
    assert_eq!(h.coordinator.worker_count(), 1);

    // Both points funnel through one worker; the second is suppressed.
    tokio::time::timeout(Duration::from_secs(2), async {
        while h.repository.alert_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("ingestion did not raise an alert in time");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.repository.alerts_for_patient(patient).unwrap().len(), 1);
}

#[tokio::test]
async fn each_patient_gets_its_own_worker() {
    let h = harness();
    let alice = PatientId::new();
    let bob = PatientId::new();

    h.coordinator.ingest(hr_point(alice, 80.0)).await.unwrap();
    h.coordinator.ingest(hr_point(bob, 80.0)).await.unwrap();
    h.coordinator.ingest(hr_point(alice, 82.0)).await.unwrap();

    assert_eq!(h.coordinator.worker_count(), 2);
    h.coordinator.shutdown();
    assert_eq!(h.coordinator.worker_count(), 0);
}
