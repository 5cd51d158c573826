use cwa_map_core::bug_report::{POLICY_OPERATOR, VALID_POLICIES};
use cwa_map_db::models::operator::{Operator, UpdateOperator};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorDto {
    pub uuid: Uuid,
    pub operator_number: Option<String>,
    pub name: String,
    pub email: Option<String>,
    /// Who receives bug reports: `operator` or `center`.
    pub report_receiver: String,
}

impl From<&Operator> for OperatorDto {
    fn from(o: &Operator) -> Self {
        Self {
            uuid: o.uuid,
            operator_number: o.operator_number.clone(),
            name: o.name.clone(),
            email: o.email.clone(),
            report_receiver: o.report_receiver.clone(),
        }
    }
}

/// Self-service profile update.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOperatorRequest {
    #[validate(length(min = 1, code = "required"))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default = "default_report_receiver")]
    #[validate(custom(function = "validate_report_receiver"))]
    pub report_receiver: String,
}

fn default_report_receiver() -> String {
    POLICY_OPERATOR.to_string()
}

fn validate_report_receiver(value: &str) -> Result<(), ValidationError> {
    if VALID_POLICIES.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("oneof"))
    }
}

impl From<UpdateOperatorRequest> for UpdateOperator {
    fn from(req: UpdateOperatorRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            email: req
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            report_receiver: req.report_receiver,
        }
    }
}
