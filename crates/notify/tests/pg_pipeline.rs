mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cwa_map_core::settings;
use cwa_map_db::models::center::{Center, SaveCenter};
use cwa_map_db::models::operator::{NewOperator, Operator};
use cwa_map_db::repositories::{BugReportRepo, CenterRepo, OperatorRepo, SystemSettingRepo};
use cwa_map_notify::reports::{publish_cycle, submit_report};
use cwa_map_notify::{NotifierConfig, OperatorNotifier, PgReportStore};
use sqlx::PgPool;
use uuid::Uuid;

use common::{RecordingMailer, UUID_TEMPLATE};

async fn operator(pool: &PgPool, subject: &str, policy: &str) -> Operator {
    let op = OperatorRepo::get_or_create(
        pool,
        &NewOperator {
            subject: subject.to_string(),
            name: format!("Operator {subject}"),
            operator_number: None,
            email: Some(format!("{subject}@operator.example")),
        },
    )
    .await
    .unwrap();
    sqlx::query("UPDATE operators SET report_receiver = $2 WHERE uuid = $1")
        .bind(op.uuid)
        .bind(policy)
        .execute(pool)
        .await
        .unwrap();
    OperatorRepo::find_by_uuid(pool, op.uuid).await.unwrap().unwrap()
}

async fn center(pool: &PgPool, operator_uuid: Uuid, email: Option<&str>) -> Center {
    let input = SaveCenter {
        uuid: None,
        operator_uuid,
        user_reference: None,
        name: "Testzentrum am Markt".to_string(),
        operator_name: None,
        lab_id: None,
        email: email.map(str::to_string),
        website: None,
        address: "Markt 3, 04109 Leipzig".to_string(),
        address_note: None,
        zip: None,
        region: None,
        longitude: 12.37,
        latitude: 51.34,
        coordinates_fixed: false,
        opening_hours: Vec::new(),
        appointment: None,
        test_kinds: Vec::new(),
        dcc: None,
        enter_date: None,
        leave_date: None,
        visible: true,
        message: None,
    };
    let mut conn = pool.acquire().await.unwrap();
    CenterRepo::save(&mut conn, &input).await.unwrap()
}

async fn make_stale(pool: &PgPool, uuid: Uuid) {
    sqlx::query("UPDATE centers SET last_update = now() - make_interval(weeks => 6) WHERE uuid = $1")
        .bind(uuid)
        .execute(pool)
        .await
        .unwrap();
}

async fn queued(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM bug_reports")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_report_is_mailed_to_center_and_deleted(pool: PgPool) {
    let op = operator(&pool, "op-center", "center").await;
    let c = center(&pool, op.uuid, Some("a@x.example")).await;
    SystemSettingRepo::upsert(
        &pool,
        settings::REPORTS_EMAIL_TEMPLATE,
        "{% for uuid, reports in Centers|items %}{% for r in reports %}\
         <p>{{ r.center_name }}, {{ r.center_address }}: {{ r.subject }}</p>\
         {% endfor %}{% endfor %}",
    )
    .await
    .unwrap();
    SystemSettingRepo::upsert(&pool, settings::REPORTS_EMAIL_SUBJECT, "Neue Fehlermeldungen")
        .await
        .unwrap();

    let store = PgReportStore::new(pool.clone());
    submit_report(&store, c.uuid, "wrong-address", None).await.unwrap();
    assert_eq!(queued(&pool).await, 1);

    let mailer = RecordingMailer::default();
    let outcome = publish_cycle(&store, &mailer).await.unwrap();
    assert_eq!(outcome.reports, 1);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].receiver, "a@x.example");
    assert!(sent[0].body.contains("Testzentrum am Markt"));
    assert!(sent[0].body.contains("Markt 3, 04109 Leipzig"));
    assert_eq!(queued(&pool).await, 0);

    let stats = BugReportRepo::list_statistics(&pool).await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].count, 1);
}

fn mailed_uuids(mailer: &RecordingMailer) -> Vec<Uuid> {
    mailer
        .sent()
        .iter()
        .flat_map(|mail| mail.body.lines().map(|line| line.parse::<Uuid>().unwrap()).collect::<Vec<_>>())
        .collect()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_cycles_partition_the_queue(pool: PgPool) {
    let op = operator(&pool, "op-center", "center").await;
    SystemSettingRepo::upsert(&pool, settings::REPORTS_EMAIL_TEMPLATE, UUID_TEMPLATE)
        .await
        .unwrap();
    SystemSettingRepo::upsert(&pool, settings::REPORTS_EMAIL_SUBJECT, "Neue Fehlermeldungen")
        .await
        .unwrap();

    let store = PgReportStore::new(pool.clone());
    let mut submitted = HashSet::new();
    for i in 0..10 {
        let email = format!("stelle-{i}@x.example");
        let c = center(&pool, op.uuid, Some(&email)).await;
        for _ in 0..10 {
            let report = submit_report(&store, c.uuid, "closed", None).await.unwrap();
            submitted.insert(report.uuid);
        }
    }
    assert_eq!(queued(&pool).await, 100);

    let first_mailer = RecordingMailer::default();
    let second_mailer = RecordingMailer::default();
    let (first, second) = tokio::join!(
        publish_cycle(&store, &first_mailer),
        publish_cycle(&store, &second_mailer),
    );
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_eq!(first.reports + second.reports, 100);

    let first_uuids = mailed_uuids(&first_mailer);
    let second_uuids = mailed_uuids(&second_mailer);
    assert_eq!(first_uuids.len(), first.reports);
    assert_eq!(second_uuids.len(), second.reports);

    let first_set: HashSet<_> = first_uuids.into_iter().collect();
    let second_set: HashSet<_> = second_uuids.into_iter().collect();
    assert!(first_set.is_disjoint(&second_set));
    let delivered: HashSet<_> = first_set.union(&second_set).copied().collect();
    assert_eq!(delivered, submitted);
    assert_eq!(queued(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reports_survive_center_deletion(pool: PgPool) {
    let op = operator(&pool, "op-a", "operator").await;
    let c = center(&pool, op.uuid, None).await;
    let store = PgReportStore::new(pool.clone());

    let report = submit_report(&store, c.uuid, "closed", Some("seit Montag zu"))
        .await
        .unwrap();
    assert_eq!(report.receiver, "op-a@operator.example");
    CenterRepo::delete(&pool, c.uuid).await.unwrap();

    assert_eq!(queued(&pool).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_notifier_reminds_stale_operators_and_centers(pool: PgPool) {
    let stale_op = operator(&pool, "op-stale", "operator").await;
    let op_center = center(&pool, stale_op.uuid, None).await;
    make_stale(&pool, op_center.uuid).await;

    let center_op = operator(&pool, "op-center", "center").await;
    let stale_center = center(&pool, center_op.uuid, Some("center@x.example")).await;
    make_stale(&pool, stale_center.uuid).await;

    for (key, value) in [
        (settings::OPERATOR_NOTIFICATION_TEMPLATE, "Hallo {{ name }}, bitte bestätigen: {{ notification_token }}"),
        (settings::OPERATOR_NOTIFICATION_SUBJECT, "Bitte Daten prüfen"),
        (settings::CENTER_NOTIFICATION_TEMPLATE, "{{ name }} ({{ address }}) ist veraltet"),
        (settings::CENTER_NOTIFICATION_SUBJECT, "Teststelle prüfen"),
    ] {
        SystemSettingRepo::upsert(&pool, key, value).await.unwrap();
    }

    let mailer = Arc::new(RecordingMailer::default());
    let notifier = OperatorNotifier::new(
        pool.clone(),
        mailer.clone(),
        NotifierConfig {
            interval: Duration::from_secs(3600),
            age_weeks: 4,
            renotify_weeks: 2,
        },
    );

    let outcome = notifier.run_cycle().await.unwrap();
    assert_eq!(outcome.notified, 2);
    assert_eq!(outcome.failed, 0);

    let stored = OperatorRepo::find_by_uuid(&pool, stale_op.uuid).await.unwrap().unwrap();
    let token = stored.notification_token.clone().unwrap();
    assert!(stored.notified.is_some());

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].receiver, "op-stale@operator.example");
    assert!(sent[0].body.contains(&token));
    assert_eq!(sent[1].receiver, "center@x.example");
    assert!(sent[1].body.contains("Markt 3, 04109 Leipzig"));

    // Both were just notified; nothing is due until the renotify window passes.
    let outcome = notifier.run_cycle().await.unwrap();
    assert_eq!(outcome.notified, 0);

    assert!(OperatorRepo::confirm_notification(&pool, &token).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_notifier_skips_operator_without_email(pool: PgPool) {
    let op = operator(&pool, "op-silent", "operator").await;
    sqlx::query("UPDATE operators SET email = NULL WHERE uuid = $1")
        .bind(op.uuid)
        .execute(&pool)
        .await
        .unwrap();
    let c = center(&pool, op.uuid, None).await;
    make_stale(&pool, c.uuid).await;

    let mailer = Arc::new(RecordingMailer::default());
    let notifier = OperatorNotifier::new(
        pool.clone(),
        mailer.clone(),
        NotifierConfig {
            interval: Duration::from_secs(3600),
            age_weeks: 4,
            renotify_weeks: 2,
        },
    );

    let outcome = notifier.run_cycle().await.unwrap();
    assert_eq!(outcome.notified, 0);
    assert_eq!(outcome.failed, 1);
    assert!(mailer.sent().is_empty());
    let stored = OperatorRepo::find_by_uuid(&pool, op.uuid).await.unwrap().unwrap();
    assert!(stored.notified.is_none());
}
