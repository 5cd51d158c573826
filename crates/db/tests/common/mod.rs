#![allow(dead_code)]

use cwa_map_db::models::center::{Center, SaveCenter};
use cwa_map_db::models::operator::{NewOperator, Operator};
use cwa_map_db::repositories::{CenterRepo, OperatorRepo};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_operator(pool: &PgPool, subject: &str) -> Operator {
    OperatorRepo::get_or_create(
        pool,
        &NewOperator {
            subject: subject.to_string(),
            name: format!("Operator {subject}"),
            operator_number: None,
            email: Some(format!("{subject}@operator.example")),
        },
    )
    .await
    .unwrap()
}

pub async fn set_policy(pool: &PgPool, operator_uuid: Uuid, policy: &str) {
    sqlx::query("UPDATE operators SET report_receiver = $2 WHERE uuid = $1")
        .bind(operator_uuid)
        .bind(policy)
        .execute(pool)
        .await
        .unwrap();
}

pub fn new_center(operator_uuid: Uuid, name: &str, longitude: f64, latitude: f64) -> SaveCenter {
    SaveCenter {
        uuid: None,
        operator_uuid,
        user_reference: None,
        name: name.to_string(),
        operator_name: None,
        lab_id: None,
        email: None,
        website: None,
        address: format!("{name} Straße 1, 10115 Berlin"),
        address_note: None,
        zip: None,
        region: None,
        longitude,
        latitude,
        coordinates_fixed: false,
        opening_hours: Vec::new(),
        appointment: None,
        test_kinds: Vec::new(),
        dcc: None,
        enter_date: None,
        leave_date: None,
        visible: true,
        message: None,
    }
}

pub async fn save(pool: &PgPool, input: &SaveCenter) -> Center {
    let mut conn = pool.acquire().await.unwrap();
    CenterRepo::save(&mut conn, input).await.unwrap()
}

/// Age a center's `last_update` by `weeks`.
pub async fn age_center(pool: &PgPool, uuid: Uuid, weeks: i32) {
    sqlx::query(
        "UPDATE centers SET last_update = now() - make_interval(weeks => $2) WHERE uuid = $1",
    )
    .bind(uuid)
    .bind(weeks)
    .execute(pool)
    .await
    .unwrap();
}
