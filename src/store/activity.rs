use chrono::NaiveDate;
use sqlx::Row;

use crate::error::StoreError;

use super::Store;

impl Store {
    /// Mark a user active on a UTC calendar day. Idempotent: the
    /// primary key absorbs repeats, so two activities on the same day
    /// leave one row.
    pub async fn record_activity(&self, user_id: &str, day: NaiveDate) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO daily_activity (user_id, day) VALUES (?, ?)")
            .bind(user_id)
            .bind(day)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All active days for a user, oldest first.
    pub async fn activity_days(&self, user_id: &str) -> Result<Vec<NaiveDate>, StoreError> {
        let rows = sqlx::query(
            "SELECT day FROM daily_activity WHERE user_id = ? ORDER BY day ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| row.try_get("day").map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, day).unwrap()
    }

    #[tokio::test]
    async fn same_day_recorded_once() {
        let store = Store::in_memory().await.unwrap();
        store.record_activity("ada", d(1)).await.unwrap();
        store.record_activity("ada", d(1)).await.unwrap();
        store.record_activity("ada", d(2)).await.unwrap();
        store.record_activity("grace", d(2)).await.unwrap();

        let days = store.activity_days("ada").await.unwrap();
        assert_eq!(days, vec![d(1), d(2)]);
    }
}
