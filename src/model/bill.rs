use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Materialized monthly aggregate for one user. `month` is normalized to the
/// first day of the calendar month. Never trusted stale: every read path
/// recomputes it from the attendance ledger before returning it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Bill {
    pub id: u64,
    pub user_id: u64,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub month: NaiveDate,

    #[schema(example = "160.00", value_type = String)]
    pub total_hours: Decimal,

    #[schema(example = "16000.00", value_type = String)]
    pub total_amount: Decimal,

    #[schema(example = "2024-01-31T17:30:00", value_type = String, format = "date-time")]
    pub generated_at: NaiveDateTime,
}
