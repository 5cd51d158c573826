//! Repository for the `system_settings` key/value table.

use sqlx::{PgExecutor, PgPool};

pub struct SystemSettingRepo;

impl SystemSettingRepo {
    pub async fn find_value(
        executor: impl PgExecutor<'_>,
        key: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT config_value FROM system_settings WHERE config_key = $1",
        )
        .bind(key)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_value_with_default(
        executor: impl PgExecutor<'_>,
        key: &str,
        default: &str,
    ) -> Result<String, sqlx::Error> {
        Ok(Self::find_value(executor, key)
            .await?
            .unwrap_or_else(|| default.to_string()))
    }

    pub async fn upsert(pool: &PgPool, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO system_settings (config_key, config_value) VALUES ($1, $2) \
             ON CONFLICT (config_key) DO UPDATE SET config_value = EXCLUDED.config_value",
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }
}
