//! Time Ledger: the append-only, authoritative store of attendance events.
//! Rows are created open on check-in, closed exactly once on check-out, and
//! never touched again (append-then-freeze).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::MySqlPool;

use crate::{error::AppError, model::attendance::Attendance};

const SELECT_COLUMNS: &str = "SELECT id, user_id, session_date, check_in, check_out FROM attendance";

pub async fn find_record(pool: &MySqlPool, record_id: u64) -> Result<Option<Attendance>, AppError> {
    let record = sqlx::query_as::<_, Attendance>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(record_id)
        .fetch_optional(pool)
        .await?;

    Ok(record)
}

/// Inserts a new open session for `user_id` dated by `now`. The unique index
/// on (user_id, session_date) is the final arbiter for concurrent check-ins:
/// whichever insert loses the race surfaces as a duplicate-key error here.
pub async fn record_check_in(
    pool: &MySqlPool,
    user_id: u64,
    now: NaiveDateTime,
) -> Result<Attendance, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (user_id, session_date, check_in)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(now.date())
    .bind(now)
    .execute(pool)
    .await;

    let done = match result {
        Ok(done) => done,
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Err(AppError::DuplicateCheckIn);
                }
            }
            return Err(e.into());
        }
    };

    find_record(pool, done.last_insert_id())
        .await?
        .ok_or(AppError::NotFound("attendance record"))
}

/// A closed record reports AlreadyCheckedOut to any caller; ownership is
/// only enforced for records still open.
fn checkout_precondition(record: &Attendance, acting_user_id: u64) -> Result<(), AppError> {
    if record.check_out.is_some() {
        return Err(AppError::AlreadyCheckedOut);
    }

    if record.user_id != acting_user_id {
        return Err(AppError::Forbidden);
    }

    Ok(())
}

/// Closes a session on behalf of its owner. The `check_out IS NULL` guard in
/// the update makes the transition single-shot: of two concurrent check-out
/// attempts exactly one updates a row, the other sees zero rows affected.
pub async fn record_check_out(
    pool: &MySqlPool,
    record_id: u64,
    now: NaiveDateTime,
    acting_user_id: u64,
) -> Result<Attendance, AppError> {
    let record = find_record(pool, record_id)
        .await?
        .ok_or(AppError::NotFound("attendance record"))?;

    checkout_precondition(&record, acting_user_id)?;

    let done = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = ?
        WHERE id = ? AND check_out IS NULL
        "#,
    )
    .bind(now)
    .bind(record_id)
    .execute(pool)
    .await?;

    if done.rows_affected() == 0 {
        return Err(AppError::AlreadyCheckedOut);
    }

    find_record(pool, record_id)
        .await?
        .ok_or(AppError::NotFound("attendance record"))
}

/// One user's records with check_in inside [month_start, next_month_start),
/// newest first.
pub async fn month_records(
    pool: &MySqlPool,
    user_id: u64,
    month_start: NaiveDate,
    next_month_start: NaiveDate,
) -> Result<Vec<Attendance>, AppError> {
    let records = sqlx::query_as::<_, Attendance>(&format!(
        "{SELECT_COLUMNS} WHERE user_id = ? AND check_in >= ? AND check_in < ? ORDER BY check_in DESC"
    ))
    .bind(user_id)
    .bind(month_start.and_time(NaiveTime::MIN))
    .bind(next_month_start.and_time(NaiveTime::MIN))
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// All users' records for a month, newest first (admin summary).
pub async fn month_records_all_users(
    pool: &MySqlPool,
    month_start: NaiveDate,
    next_month_start: NaiveDate,
) -> Result<Vec<Attendance>, AppError> {
    let records = sqlx::query_as::<_, Attendance>(&format!(
        "{SELECT_COLUMNS} WHERE check_in >= ? AND check_in < ? ORDER BY check_in DESC"
    ))
    .bind(month_start.and_time(NaiveTime::MIN))
    .bind(next_month_start.and_time(NaiveTime::MIN))
    .fetch_all(pool)
    .await?;

    Ok(records)
}

pub async fn today_record(
    pool: &MySqlPool,
    user_id: u64,
    day: NaiveDate,
) -> Result<Option<Attendance>, AppError> {
    let record = sqlx::query_as::<_, Attendance>(&format!(
        "{SELECT_COLUMNS} WHERE user_id = ? AND session_date = ?"
    ))
    .bind(user_id)
    .bind(day)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Sessions still open whose day is on or before the given date.
pub async fn open_sessions(
    pool: &MySqlPool,
    on_or_before: NaiveDate,
) -> Result<Vec<Attendance>, AppError> {
    let records = sqlx::query_as::<_, Attendance>(&format!(
        "{SELECT_COLUMNS} WHERE check_out IS NULL AND session_date <= ? ORDER BY check_in"
    ))
    .bind(on_or_before)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Closes an open session without an owner check (sweeper path). Returns
/// false if the session was already closed by the time the update ran.
pub async fn close_open_session(
    pool: &MySqlPool,
    record_id: u64,
    check_out: NaiveDateTime,
) -> Result<bool, AppError> {
    let done = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = ?
        WHERE id = ? AND check_out IS NULL
        "#,
    )
    .bind(check_out)
    .bind(record_id)
    .execute(pool)
    .await?;

    Ok(done.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn record(user_id: u64, check_out: Option<&str>) -> Attendance {
        let check_in = dt("2024-01-05T09:00:00");
        Attendance {
            id: 1,
            user_id,
            session_date: check_in.date(),
            check_in,
            check_out: check_out.map(dt),
        }
    }

    #[test]
    fn closed_record_rejects_everyone_as_already_checked_out() {
        let closed = record(7, Some("2024-01-05T17:00:00"));
        // even a non-owner sees the closed state, not a 403
        assert!(matches!(
            checkout_precondition(&closed, 7),
            Err(AppError::AlreadyCheckedOut)
        ));
        assert!(matches!(
            checkout_precondition(&closed, 8),
            Err(AppError::AlreadyCheckedOut)
        ));
    }

    #[test]
    fn open_record_enforces_ownership() {
        let open = record(7, None);
        assert!(matches!(checkout_precondition(&open, 8), Err(AppError::Forbidden)));
        assert!(checkout_precondition(&open, 7).is_ok());
    }
}
