//! Bug report validation, recipient resolution and batch grouping.

use std::hash::Hash;

use indexmap::IndexMap;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Maximum length of the report subject (characters).
pub const MAX_SUBJECT_LENGTH: usize = 160;

/// Maximum length of the optional free-text message (characters).
pub const MAX_MESSAGE_LENGTH: usize = 160;

pub fn validate_subject(subject: &str) -> Result<(), CoreError> {
    if subject.trim().is_empty() {
        return Err(CoreError::Validation("subject must not be empty".into()));
    }
    if subject.chars().count() > MAX_SUBJECT_LENGTH {
        return Err(CoreError::Validation(format!(
            "subject exceeds maximum length of {MAX_SUBJECT_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_message(message: &str) -> Result<(), CoreError> {
    if message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(CoreError::Validation(format!(
            "message exceeds maximum length of {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recipient policy
// ---------------------------------------------------------------------------

/// Reports go to the operator's contact address.
pub const POLICY_OPERATOR: &str = "operator";
/// Reports go to the affected center's own address.
pub const POLICY_CENTER: &str = "center";

pub const VALID_POLICIES: &[&str] = &[POLICY_OPERATOR, POLICY_CENTER];

pub fn validate_policy(policy: &str) -> Result<(), CoreError> {
    if VALID_POLICIES.contains(&policy) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid report receiver '{policy}'. Must be one of: {VALID_POLICIES:?}"
        )))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Pick the e-mail address a report about a center is delivered to.
///
/// Cascade: the center's address when the operator chose the `center`
/// policy, then the operator's address, then the configured default.
pub fn resolve_recipient(
    policy: &str,
    center_email: Option<&str>,
    operator_email: Option<&str>,
    default_email: Option<&str>,
) -> Result<String, CoreError> {
    let center = if policy == POLICY_CENTER {
        non_empty(center_email)
    } else {
        None
    };

    center
        .or_else(|| non_empty(operator_email))
        .or_else(|| non_empty(default_email))
        .map(str::to_string)
        .ok_or_else(|| {
            CoreError::Configuration("no recipient for bug report and no default configured".into())
        })
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Group reports by recipient, then by center, keeping first-seen order at
/// both levels and insertion order inside each center.
pub fn group_reports<R, K, FR, FC>(
    reports: Vec<R>,
    recipient_of: FR,
    center_of: FC,
) -> IndexMap<String, IndexMap<K, Vec<R>>>
where
    K: Hash + Eq,
    FR: Fn(&R) -> String,
    FC: Fn(&R) -> K,
{
    let mut grouped: IndexMap<String, IndexMap<K, Vec<R>>> = IndexMap::new();
    for report in reports {
        grouped
            .entry(recipient_of(&report))
            .or_default()
            .entry(center_of(&report))
            .or_default()
            .push(report);
    }
    grouped
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_length_limit_counts_characters() {
        assert!(validate_subject(&"ä".repeat(160)).is_ok());
        assert!(validate_subject(&"a".repeat(161)).is_err());
        assert!(validate_subject("   ").is_err());
    }

    #[test]
    fn message_length_limit() {
        assert!(validate_message("").is_ok());
        assert!(validate_message(&"x".repeat(161)).is_err());
    }

    #[test]
    fn policy_validation() {
        assert!(validate_policy("center").is_ok());
        assert!(validate_policy("operator").is_ok());
        assert!(validate_policy("nobody").is_err());
    }

    #[test]
    fn center_policy_prefers_center_email() {
        let r = resolve_recipient("center", Some("a@x"), Some("op@x"), Some("d@x")).unwrap();
        assert_eq!(r, "a@x");
    }

    #[test]
    fn center_policy_falls_back_to_operator() {
        let r = resolve_recipient("center", Some(" "), Some("op@x"), None).unwrap();
        assert_eq!(r, "op@x");
    }

    #[test]
    fn operator_policy_ignores_center_email() {
        let r = resolve_recipient("operator", Some("a@x"), None, Some("d@x")).unwrap();
        assert_eq!(r, "d@x");
    }

    #[test]
    fn missing_everything_is_configuration_error() {
        let err = resolve_recipient("operator", None, None, None).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn grouping_preserves_first_seen_order() {
        let reports = vec![
            ("b@x", 2, "r1"),
            ("a@x", 1, "r2"),
            ("b@x", 3, "r3"),
            ("b@x", 2, "r4"),
        ];
        let grouped = group_reports(reports, |r| r.0.to_string(), |r| r.1);

        let recipients: Vec<&String> = grouped.keys().collect();
        assert_eq!(recipients, vec!["b@x", "a@x"]);

        let b = &grouped["b@x"];
        let centers: Vec<&i32> = b.keys().collect();
        assert_eq!(centers, vec![&2, &3]);
        let ids: Vec<&str> = b[&2].iter().map(|r| r.2).collect();
        assert_eq!(ids, vec!["r1", "r4"]);
    }
}
