//! Attendance Session Manager: the per-user daily state machine gating
//! check-in/check-out, and the trigger point for bill refresh. The state for
//! a (user, day) lives entirely in the ledger row: no row means NotCheckedIn,
//! an open row means CheckedIn, a closed row means CheckedOut (terminal for
//! that day). A new day starts with no row, so the state resets implicitly.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::{
    billing,
    clock::Clock,
    error::AppError,
    ledger,
    model::{attendance::Attendance, bill::Bill},
};

/// NotCheckedIn -> CheckedIn, or DuplicateCheckIn if a row already exists for
/// the user's current day (the unique index arbitrates races).
pub async fn check_in(
    pool: &MySqlPool,
    clock: &dyn Clock,
    user_id: u64,
) -> Result<Attendance, AppError> {
    let record = ledger::record_check_in(pool, user_id, clock.now()).await?;

    tracing::info!(user_id, record_id = record.id, "Checked in");

    Ok(record)
}

/// CheckedIn -> CheckedOut, then synchronously refreshes the bill for the
/// month of the session's check_in before returning. Callers get the closed
/// record and a freshly recomputed bill in the same response.
pub async fn check_out(
    pool: &MySqlPool,
    clock: &dyn Clock,
    record_id: u64,
    acting_user_id: u64,
) -> Result<(Attendance, Bill), AppError> {
    let now = clock.now();
    let record = ledger::record_check_out(pool, record_id, now, acting_user_id).await?;

    let month = billing::month_of(record.check_in.date());
    let bill = billing::get_or_create_bill(pool, record.user_id, month, now).await?;

    tracing::info!(
        user_id = record.user_id,
        record_id = record.id,
        hours = %record.hours_worked(),
        "Checked out"
    );

    Ok((record, bill))
}

#[derive(Serialize, ToSchema)]
pub struct Dashboard {
    pub today: Option<Attendance>,
    pub month_records: Vec<Attendance>,
    pub current_bill: Bill,
    pub last_month_bill: Option<Bill>,

    /// Hours accrued today, computed on read; for an open session this is
    /// `now - check_in`, never a stored value.
    #[schema(example = "3.25", value_type = String)]
    pub live_hours_today: Decimal,
}

/// One user's view: today's record, the current month's records (newest
/// first), and the current/last month bills, both refreshed on this read.
pub async fn dashboard(
    pool: &MySqlPool,
    clock: &dyn Clock,
    user_id: u64,
) -> Result<Dashboard, AppError> {
    let now = clock.now();
    let today = now.date();
    let month_start = billing::month_of(today);

    let current_bill = billing::get_or_create_bill(pool, user_id, month_start, now).await?;
    let last_month_bill =
        billing::refresh_existing_bill(pool, user_id, billing::prev_month(month_start), now).await?;

    let month_records =
        ledger::month_records(pool, user_id, month_start, billing::next_month(month_start)).await?;
    let today_record = ledger::today_record(pool, user_id, today).await?;

    let live_hours_today = today_record
        .as_ref()
        .map(|r| r.live_hours(now))
        .unwrap_or(Decimal::ZERO);

    Ok(Dashboard {
        today: today_record,
        month_records,
        current_bill,
        last_month_bill,
        live_hours_today,
    })
}
