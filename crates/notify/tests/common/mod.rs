#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use cwa_map_db::models::bug_report::{BugReport, NewBugReport, ReportTarget};
use cwa_map_notify::{MailError, Mailer, ReportStore};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SentMail {
    pub receiver: String,
    pub subject: String,
    pub content_type: String,
    pub body: String,
}

/// Records every message; fails for one configured receiver.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    pub fail_for: Option<String>,
}

impl RecordingMailer {
    pub fn failing_for(receiver: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: Some(receiver.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        receiver: &str,
        subject: &str,
        content_type: &str,
        body: &str,
    ) -> Result<(), MailError> {
        if self.fail_for.as_deref() == Some(receiver) {
            return Err(MailError::Build("smtp unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            receiver: receiver.to_string(),
            subject: subject.to_string(),
            content_type: content_type.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    reports: Vec<BugReport>,
    targets: HashMap<Uuid, ReportTarget>,
    settings: HashMap<String, String>,
    /// Every lease that ever claimed something, with the report UUIDs it got.
    claims: HashMap<Uuid, Vec<Uuid>>,
}

/// In-memory [`ReportStore`]; every call is atomic like a single statement.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn with_settings(pairs: &[(&str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            for (k, v) in pairs {
                state.settings.insert(k.to_string(), v.to_string());
            }
        }
        store
    }

    pub fn add_target(&self, target: ReportTarget) {
        self.state
            .lock()
            .unwrap()
            .targets
            .insert(target.center_uuid, target);
    }

    /// Queue a report directly, bypassing intake.
    pub fn enqueue(&self, receiver: &str, center_uuid: Uuid, subject: &str) -> Uuid {
        let report = BugReport {
            uuid: Uuid::new_v4(),
            created: chrono::Utc::now(),
            receiver: receiver.to_string(),
            operator_uuid: Uuid::nil(),
            center_uuid,
            center_name: format!("Center {center_uuid}"),
            center_address: "Hauptstraße 1, 10115 Berlin".to_string(),
            subject: subject.to_string(),
            message: None,
            lease: None,
        };
        let uuid = report.uuid;
        self.state.lock().unwrap().reports.push(report);
        uuid
    }

    pub fn remaining(&self) -> Vec<BugReport> {
        self.state.lock().unwrap().reports.clone()
    }

    pub fn claims(&self) -> HashMap<Uuid, Vec<Uuid>> {
        self.state.lock().unwrap().claims.clone()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn find_target(&self, center_uuid: Uuid) -> Result<Option<ReportTarget>, sqlx::Error> {
        Ok(self.state.lock().unwrap().targets.get(&center_uuid).cloned())
    }

    async fn find_setting(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        Ok(self.state.lock().unwrap().settings.get(key).cloned())
    }

    async fn record_report(&self, report: NewBugReport) -> Result<BugReport, sqlx::Error> {
        let created = BugReport {
            uuid: Uuid::new_v4(),
            created: chrono::Utc::now(),
            receiver: report.receiver,
            operator_uuid: report.operator_uuid,
            center_uuid: report.center_uuid,
            center_name: report.center_name,
            center_address: report.center_address,
            subject: report.subject,
            message: report.message,
            lease: None,
        };
        self.state.lock().unwrap().reports.push(created.clone());
        Ok(created)
    }

    async fn claim(&self, lease: Uuid) -> Result<u64, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let mut claimed = Vec::new();
        for report in state.reports.iter_mut().filter(|r| r.lease.is_none()) {
            report.lease = Some(lease);
            claimed.push(report.uuid);
        }
        let count = claimed.len() as u64;
        if count > 0 {
            state.claims.insert(lease, claimed);
        }
        Ok(count)
    }

    async fn find_by_lease(&self, lease: Uuid) -> Result<Vec<BugReport>, sqlx::Error> {
        tokio::task::yield_now().await;
        Ok(self
            .state
            .lock()
            .unwrap()
            .reports
            .iter()
            .filter(|r| r.lease == Some(lease))
            .cloned()
            .collect())
    }

    async fn release_lease(&self, lease: Uuid) -> Result<u64, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let mut released = 0;
        for report in state.reports.iter_mut().filter(|r| r.lease == Some(lease)) {
            report.lease = None;
            released += 1;
        }
        Ok(released)
    }

    async fn delete_by_lease(&self, lease: Uuid) -> Result<u64, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let before = state.reports.len();
        state.reports.retain(|r| r.lease != Some(lease));
        Ok((before - state.reports.len()) as u64)
    }
}

/// Lists every report UUID, one per line.
pub const UUID_TEMPLATE: &str =
    "{% for center, reports in Centers|items %}{% for r in reports %}{{ r.uuid }}\n{% endfor %}{% endfor %}";
