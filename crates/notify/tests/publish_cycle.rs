mod common;

use std::collections::HashSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use cwa_map_core::error::CoreError;
use cwa_map_core::settings;
use cwa_map_db::models::bug_report::ReportTarget;
use cwa_map_notify::reports::{publish_cycle, submit_report, PublishOutcome};
use cwa_map_notify::NotifyError;
use uuid::Uuid;

use common::{MemoryStore, RecordingMailer, UUID_TEMPLATE};

fn configured_store(template: &str) -> MemoryStore {
    MemoryStore::with_settings(&[
        (settings::REPORTS_EMAIL_TEMPLATE, template),
        (settings::REPORTS_EMAIL_SUBJECT, "Fehlermeldungen"),
    ])
}

#[tokio::test]
async fn test_empty_queue_sends_nothing() {
    let store = configured_store(UUID_TEMPLATE);
    let mailer = RecordingMailer::default();

    let outcome = publish_cycle(&store, &mailer).await.unwrap();

    assert_eq!(outcome, PublishOutcome::default());
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_one_mail_per_recipient_grouped_by_center() {
    let store = configured_store(
        "{% for center, reports in Centers|items %}[{{ center }}:{% for r in reports %}{{ r.subject }},{% endfor %}]{% endfor %}",
    );
    let mailer = RecordingMailer::default();
    let center_a = Uuid::new_v4();
    let center_b = Uuid::new_v4();

    store.enqueue("ops@a.example", center_b, "closed");
    store.enqueue("ops@a.example", center_a, "wrong-address");
    store.enqueue("other@b.example", center_a, "wrong-hours");
    store.enqueue("ops@a.example", center_b, "wrong-hours");

    let outcome = publish_cycle(&store, &mailer).await.unwrap();
    assert_eq!(
        outcome,
        PublishOutcome {
            reports: 4,
            recipients: 2,
        }
    );

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].receiver, "ops@a.example");
    assert_eq!(sent[0].subject, "Fehlermeldungen");
    assert_eq!(sent[0].content_type, "text/html");
    assert_eq!(
        sent[0].body,
        format!("[{center_b}:closed,wrong-hours,][{center_a}:wrong-address,]")
    );
    assert_eq!(sent[1].receiver, "other@b.example");
    assert_eq!(sent[1].body, format!("[{center_a}:wrong-hours,]"));
    assert!(store.remaining().is_empty());
}

#[tokio::test]
async fn test_missing_template_releases_lease() {
    let store = MemoryStore::with_settings(&[(settings::REPORTS_EMAIL_SUBJECT, "s")]);
    let mailer = RecordingMailer::default();
    store.enqueue("ops@a.example", Uuid::new_v4(), "closed");

    let err = publish_cycle(&store, &mailer).await.unwrap_err();

    assert_matches!(err, NotifyError::Core(CoreError::Configuration(_)));
    let remaining = store.remaining();
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].lease.is_none());
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_send_failure_keeps_whole_batch_queued() {
    let store = configured_store(UUID_TEMPLATE);
    let mailer = RecordingMailer::failing_for("broken@b.example");
    store.enqueue("ops@a.example", Uuid::new_v4(), "closed");
    store.enqueue("broken@b.example", Uuid::new_v4(), "closed");

    let err = publish_cycle(&store, &mailer).await.unwrap_err();
    assert_matches!(err, NotifyError::Mail(_));

    let remaining = store.remaining();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|r| r.lease.is_none()));

    // The next cycle picks the reports up again.
    let healthy = RecordingMailer::default();
    let outcome = publish_cycle(&store, &healthy).await.unwrap();
    assert_eq!(outcome.reports, 2);
    assert!(store.remaining().is_empty());
}

#[tokio::test]
async fn test_reports_queued_after_cycle_wait_for_next_one() {
    let store = configured_store(UUID_TEMPLATE);
    let mailer = RecordingMailer::default();
    let first = store.enqueue("ops@a.example", Uuid::new_v4(), "closed");

    publish_cycle(&store, &mailer).await.unwrap();
    let late = store.enqueue("ops@a.example", Uuid::new_v4(), "closed");

    assert_eq!(mailer.sent()[0].body, format!("{first}\n"));
    assert_eq!(store.remaining().len(), 1);
    assert_eq!(store.remaining()[0].uuid, late);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_cycles_partition_the_queue() {
    let store = Arc::new(configured_store(UUID_TEMPLATE));
    let mailer = Arc::new(RecordingMailer::default());
    let mut all = HashSet::new();
    for i in 0..100 {
        let receiver = format!("r{}@example.org", i % 7);
        all.insert(store.enqueue(&receiver, Uuid::new_v4(), "closed"));
    }

    let cycles: Vec<_> = (0..2)
        .map(|_| {
            let store = store.clone();
            let mailer = mailer.clone();
            tokio::spawn(async move { publish_cycle(store.as_ref(), mailer.as_ref()).await })
        })
        .collect();
    let mut delivered = 0;
    for cycle in cycles {
        delivered += cycle.await.unwrap().unwrap().reports;
    }

    assert_eq!(delivered, 100);
    assert!(store.remaining().is_empty());

    let claims = store.claims();
    let mut union = HashSet::new();
    for uuids in claims.values() {
        for uuid in uuids {
            assert!(union.insert(*uuid), "report {uuid} claimed twice");
        }
    }
    assert_eq!(union, all);

    let mailed: Vec<Uuid> = mailer
        .sent()
        .iter()
        .flat_map(|m| m.body.lines().map(|l| l.parse::<Uuid>().unwrap()).collect::<Vec<_>>())
        .collect();
    assert_eq!(mailed.len(), 100);
    assert_eq!(mailed.into_iter().collect::<HashSet<_>>(), all);
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

fn target(policy: &str, center_email: Option<&str>, operator_email: Option<&str>) -> ReportTarget {
    ReportTarget {
        center_uuid: Uuid::new_v4(),
        center_name: "Testzentrum Mitte".to_string(),
        center_address: "Hauptstraße 1, 10115 Berlin".to_string(),
        center_email: center_email.map(str::to_string),
        operator_uuid: Uuid::new_v4(),
        operator_email: operator_email.map(str::to_string),
        report_receiver: policy.to_string(),
    }
}

#[tokio::test]
async fn test_submit_resolves_recipient_and_denormalizes_center() {
    let store = MemoryStore::default();
    let t = target("center", Some("a@x.example"), Some("ops@x.example"));
    let center = t.center_uuid;
    store.add_target(t);

    let report = submit_report(&store, center, "wrong-address", Some("  "))
        .await
        .unwrap();

    assert_eq!(report.receiver, "a@x.example");
    assert_eq!(report.center_name, "Testzentrum Mitte");
    assert_eq!(report.message, None);
    assert!(report.lease.is_none());
}

#[tokio::test]
async fn test_submit_falls_back_to_default_email() {
    let store = MemoryStore::with_settings(&[(settings::REPORTS_EMAIL_DEFAULT, "support@example.org")]);
    let t = target("operator", Some("a@x.example"), None);
    let center = t.center_uuid;
    store.add_target(t);

    let report = submit_report(&store, center, "closed", None).await.unwrap();
    assert_eq!(report.receiver, "support@example.org");
}

#[tokio::test]
async fn test_submit_errors() {
    let store = MemoryStore::default();
    let t = target("operator", None, None);
    let center = t.center_uuid;
    store.add_target(t);

    assert_matches!(
        submit_report(&store, Uuid::new_v4(), "closed", None).await,
        Err(NotifyError::Core(CoreError::NotFound { .. }))
    );
    assert_matches!(
        submit_report(&store, center, "closed", None).await,
        Err(NotifyError::Core(CoreError::Configuration(_)))
    );
    assert_matches!(
        submit_report(&store, center, &"x".repeat(161), None).await,
        Err(NotifyError::Core(CoreError::Validation(_)))
    );
    assert!(store.remaining().is_empty());
}
