use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One check-in/check-out session. `session_date` is derived from `check_in`
/// (UTC) at insert time and carries the per-day uniqueness constraint.
/// A row is never mutated again once `check_out` is set.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: u64,
    pub user_id: u64,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub session_date: NaiveDate,

    #[schema(example = "2024-01-01T09:00:00", value_type = String, format = "date-time")]
    pub check_in: NaiveDateTime,

    #[schema(example = "2024-01-01T17:30:00", value_type = String, format = "date-time")]
    pub check_out: Option<NaiveDateTime>,
}

impl Attendance {
    /// Hours for a closed session, 0 while still open.
    pub fn hours_worked(&self) -> Decimal {
        match self.check_out {
            Some(out) => span_hours(self.check_in, out),
            None => Decimal::ZERO,
        }
    }

    /// Hours as of `now` for an open session; computed on read, never stored.
    /// Falls back to the recorded hours once the session is closed.
    pub fn live_hours(&self, now: NaiveDateTime) -> Decimal {
        match self.check_out {
            Some(_) => self.hours_worked(),
            None => span_hours(self.check_in, now),
        }
    }

    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }
}

/// Elapsed hours between two timestamps as an exact decimal, rounded half-up
/// to 2 places. No binary floating point at any stage.
pub fn span_hours(from: NaiveDateTime, to: NaiveDateTime) -> Decimal {
    let seconds = (to - from).num_seconds().max(0);
    (Decimal::from(seconds) / dec!(3600)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn record(check_in: &str, check_out: Option<&str>) -> Attendance {
        let check_in = dt(check_in);
        Attendance {
            id: 1,
            user_id: 7,
            session_date: check_in.date(),
            check_in,
            check_out: check_out.map(dt),
        }
    }

    #[test]
    fn full_day_is_eight_and_a_half_hours() {
        let r = record("2024-01-01T09:00:00", Some("2024-01-01T17:30:00"));
        assert_eq!(r.hours_worked(), dec!(8.50));
    }

    #[test]
    fn open_session_has_zero_recorded_hours() {
        let r = record("2024-01-01T09:00:00", None);
        assert_eq!(r.hours_worked(), Decimal::ZERO);
        assert!(r.is_open());
    }

    #[test]
    fn live_hours_accrue_from_check_in() {
        let r = record("2024-01-01T09:00:00", None);
        assert_eq!(r.live_hours(dt("2024-01-01T13:15:00")), dec!(4.25));
    }

    #[test]
    fn live_hours_freeze_after_checkout() {
        let r = record("2024-01-01T09:00:00", Some("2024-01-01T13:00:00"));
        assert_eq!(r.live_hours(dt("2024-01-01T18:00:00")), dec!(4.00));
    }

    #[test]
    fn sub_hour_spans_round_half_up() {
        // 100 minutes = 1.6666... hours
        let r = record("2024-01-01T09:00:00", Some("2024-01-01T10:40:00"));
        assert_eq!(r.hours_worked(), dec!(1.67));
    }

    #[test]
    fn negative_spans_clamp_to_zero() {
        assert_eq!(
            span_hours(dt("2024-01-01T10:00:00"), dt("2024-01-01T09:00:00")),
            Decimal::ZERO
        );
    }
}
