//! Bill Aggregator: recomputes (total_hours, total_amount) for a (user, month)
//! pair from the attendance ledger and materializes it into the bills table.
//! The ledger is authoritative; a stored bill is overwritten on every access
//! so it can never drift.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::MySqlPool;

use crate::{
    error::AppError,
    ledger,
    model::{attendance::Attendance, bill::Bill},
};

/// First and next-first day for a calendar month, validating the period.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or(AppError::InvalidPeriod)?;
    Ok((start, next_month(start)))
}

/// First day of the month containing `day`.
pub fn month_of(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

pub fn next_month(month_start: NaiveDate) -> NaiveDate {
    let (year, month) = if month_start.month() == 12 {
        (month_start.year() + 1, 1)
    } else {
        (month_start.year(), month_start.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(month_start)
}

pub fn prev_month(month_start: NaiveDate) -> NaiveDate {
    let (year, month) = if month_start.month() == 1 {
        (month_start.year() - 1, 12)
    } else {
        (month_start.year(), month_start.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(month_start)
}

/// Pure aggregation step: sum of per-record hours, amount = hours x rate.
/// A pure function of its inputs, so recomputation converges no matter how
/// concurrent triggers interleave.
pub fn compute_totals(records: &[Attendance], hourly_rate: Decimal) -> (Decimal, Decimal) {
    let total_hours: Decimal = records.iter().map(Attendance::hours_worked).sum();
    let total_amount = (total_hours * hourly_rate)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    (total_hours, total_amount)
}

pub async fn hourly_rate(pool: &MySqlPool, user_id: u64) -> Result<Decimal, AppError> {
    sqlx::query_scalar::<_, Decimal>("SELECT hourly_rate FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("user"))
}

/// Recomputes the month's totals from current ledger state and the user's
/// *current* hourly rate. Rate changes re-price past months on their next
/// recompute; nothing is frozen at session time.
pub async fn recompute(
    pool: &MySqlPool,
    user_id: u64,
    month_start: NaiveDate,
) -> Result<(Decimal, Decimal), AppError> {
    let rate = hourly_rate(pool, user_id).await?;
    let records = ledger::month_records(pool, user_id, month_start, next_month(month_start)).await?;
    Ok(compute_totals(&records, rate))
}

/// Loads or creates the bill for (user, month), always refreshing its totals
/// first. Last writer wins on the bill row; recomputation is pure so any
/// interleaving converges.
pub async fn get_or_create_bill(
    pool: &MySqlPool,
    user_id: u64,
    month_start: NaiveDate,
    now: NaiveDateTime,
) -> Result<Bill, AppError> {
    let (total_hours, total_amount) = recompute(pool, user_id, month_start).await?;

    sqlx::query(
        r#"
        INSERT INTO bills (user_id, month, total_hours, total_amount, generated_at)
        VALUES (?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            total_hours = VALUES(total_hours),
            total_amount = VALUES(total_amount),
            generated_at = VALUES(generated_at)
        "#,
    )
    .bind(user_id)
    .bind(month_start)
    .bind(total_hours)
    .bind(total_amount)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Bill>(
        r#"
        SELECT id, user_id, month, total_hours, total_amount, generated_at
        FROM bills
        WHERE user_id = ? AND month = ?
        "#,
    )
    .bind(user_id)
    .bind(month_start)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("bill"))
}

/// Refreshes an existing bill, or returns None without creating one. Used for
/// months the user may never have worked (e.g. last month on the dashboard).
pub async fn refresh_existing_bill(
    pool: &MySqlPool,
    user_id: u64,
    month_start: NaiveDate,
    now: NaiveDateTime,
) -> Result<Option<Bill>, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM bills WHERE user_id = ? AND month = ?)",
    )
    .bind(user_id)
    .bind(month_start)
    .fetch_one(pool)
    .await?;

    if !exists {
        return Ok(None);
    }

    get_or_create_bill(pool, user_id, month_start, now).await.map(Some)
}

pub async fn bills_for_month(pool: &MySqlPool, month_start: NaiveDate) -> Result<Vec<Bill>, AppError> {
    let bills = sqlx::query_as::<_, Bill>(
        r#"
        SELECT id, user_id, month, total_hours, total_amount, generated_at
        FROM bills
        WHERE month = ?
        ORDER BY user_id
        "#,
    )
    .bind(month_start)
    .fetch_all(pool)
    .await?;

    Ok(bills)
}

pub async fn bills_for_user(pool: &MySqlPool, user_id: u64) -> Result<Vec<Bill>, AppError> {
    let bills = sqlx::query_as::<_, Bill>(
        r#"
        SELECT id, user_id, month, total_hours, total_amount, generated_at
        FROM bills
        WHERE user_id = ?
        ORDER BY month DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(bills)
}

/// Sum of bill totals for a month (admin summary cross-check).
pub fn sum_bills(bills: &[Bill]) -> (Decimal, Decimal) {
    let total_hours = bills.iter().map(|b| b.total_hours).sum();
    let total_amount = bills.iter().map(|b| b.total_amount).sum();
    (total_hours, total_amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rust_decimal_macros::dec;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn closed(id: u64, check_in: &str, check_out: &str) -> Attendance {
        let check_in = dt(check_in);
        Attendance {
            id,
            user_id: 7,
            session_date: check_in.date(),
            check_in,
            check_out: Some(dt(check_out)),
        }
    }

    #[test]
    fn four_hours_at_one_hundred_is_four_hundred() {
        let records = vec![closed(1, "2024-01-05T09:00:00", "2024-01-05T13:00:00")];
        let (hours, amount) = compute_totals(&records, dec!(100.00));
        assert_eq!(hours, dec!(4.00));
        assert_eq!(amount, dec!(400.00));
    }

    #[test]
    fn recompute_is_idempotent_for_unchanged_records() {
        let records = vec![
            closed(1, "2024-01-05T09:00:00", "2024-01-05T17:30:00"),
            closed(2, "2024-01-06T10:00:00", "2024-01-06T14:20:00"),
        ];
        let first = compute_totals(&records, dec!(72.50));
        let second = compute_totals(&records, dec!(72.50));
        assert_eq!(first, second);
    }

    #[test]
    fn rate_change_reprices_proportionally() {
        let records = vec![closed(1, "2024-01-05T09:00:00", "2024-01-05T17:00:00")];
        let (hours, old_amount) = compute_totals(&records, dec!(100.00));
        let (_, new_amount) = compute_totals(&records, dec!(150.00));
        assert_eq!(old_amount, dec!(800.00));
        assert_eq!(new_amount, hours * dec!(150.00));
    }

    #[test]
    fn open_sessions_contribute_nothing() {
        let open = Attendance {
            id: 3,
            user_id: 7,
            session_date: dt("2024-01-07T09:00:00").date(),
            check_in: dt("2024-01-07T09:00:00"),
            check_out: None,
        };
        let (hours, amount) = compute_totals(&[open], dec!(100.00));
        assert_eq!(hours, Decimal::ZERO);
        assert_eq!(amount, Decimal::ZERO);
    }

    #[test]
    fn month_bounds_roll_over_december() {
        let (start, next) = month_bounds(2024, 12).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(next, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn month_bounds_reject_bad_month() {
        assert!(matches!(month_bounds(2024, 13), Err(AppError::InvalidPeriod)));
        assert!(matches!(month_bounds(2024, 0), Err(AppError::InvalidPeriod)));
    }

    #[test]
    fn prev_month_rolls_back_january() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(prev_month(jan), NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
    }

    #[test]
    fn summary_totals_equal_sum_of_bills() {
        let bill = |id, hours, amount| Bill {
            id,
            user_id: id,
            month: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            total_hours: hours,
            total_amount: amount,
            generated_at: dt("2024-01-31T12:00:00"),
        };
        let bills = vec![
            bill(1, dec!(10.00), dec!(1000.00)),
            bill(2, dec!(7.50), dec!(375.00)),
            bill(3, dec!(0.00), dec!(0.00)),
        ];
        let (hours, amount) = sum_bills(&bills);
        assert_eq!(hours, dec!(17.50));
        assert_eq!(amount, dec!(1375.00));
    }
}
