//! Forced Checkout Sweeper: closes sessions a user forgot to end at a daily
//! cutoff (default 20:00), never writing a checkout time in the future. Runs
//! as a periodic background task, decoupled from request handling.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;
use tracing::{debug, error, info, warn};

use crate::{billing, clock::SharedClock, error::AppError, ledger};

/// The timestamp forced checkouts are closed with: today at `cutoff_hour`, or
/// the invocation time if the sweep runs before the cutoff.
pub fn effective_cutoff(now: NaiveDateTime, cutoff_hour: u32) -> NaiveDateTime {
    let cutoff = now
        .date()
        .and_hms_opt(cutoff_hour, 0, 0)
        .unwrap_or(now);

    if now < cutoff { now } else { cutoff }
}

/// Closes every open session dated today with the effective cutoff, then
/// refreshes the bill of each affected (user, month). Returns the number of
/// sessions closed.
///
/// Safe to run repeatedly: already-closed sessions are excluded by the open
/// filter, and a session that races with a manual check-out is simply skipped.
/// Sessions left open from a prior day are out of scope for the daily sweep
/// and are left untouched, as is a session opened after the cutoff itself.
pub async fn sweep(
    pool: &MySqlPool,
    now: NaiveDateTime,
    cutoff_hour: u32,
) -> Result<u64, AppError> {
    let today = now.date();
    let checkout_at = effective_cutoff(now, cutoff_hour);

    let open = ledger::open_sessions(pool, today).await?;

    let mut closed = 0u64;
    let mut touched: Vec<(u64, NaiveDate)> = Vec::new();

    for record in open {
        if record.session_date != today {
            debug!(record_id = record.id, session_date = %record.session_date, "Skipping stale open session");
            continue;
        }

        if record.check_in >= checkout_at {
            // closing would violate check_out > check_in
            debug!(record_id = record.id, "Session opened after cutoff, leaving open");
            continue;
        }

        match ledger::close_open_session(pool, record.id, checkout_at).await {
            Ok(true) => {
                closed += 1;
                let key = (record.user_id, billing::month_of(record.session_date));
                if !touched.contains(&key) {
                    touched.push(key);
                }
            }
            Ok(false) => {
                // a manual check-out won the race
            }
            Err(e) => {
                warn!(error = %e, record_id = record.id, "Failed to force-close session");
            }
        }
    }

    for (user_id, month) in touched {
        if let Err(e) = billing::get_or_create_bill(pool, user_id, month, now).await {
            warn!(error = %e, user_id, %month, "Failed to refresh bill after forced checkout");
        }
    }

    Ok(closed)
}

/// Periodic runner, spawned from main alongside the HTTP server.
pub async fn run(pool: MySqlPool, clock: SharedClock, cutoff_hour: u32, interval_secs: u64) {
    info!(cutoff_hour, interval_secs, "Forced checkout sweeper started");

    loop {
        match sweep(&pool, clock.now(), cutoff_hour).await {
            Ok(0) => debug!("Sweep found nothing to close"),
            Ok(n) => info!(closed = n, "Forced checkout sweep closed sessions"),
            Err(e) => error!(error = %e, "Forced checkout sweep failed"),
        }

        actix_web::rt::time::sleep(Duration::from_secs(interval_secs)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn after_cutoff_closes_at_cutoff() {
        // invoked at 21:00 -> sessions close at 20:00, not 21:00
        assert_eq!(
            effective_cutoff(dt("2024-01-05T21:00:00"), 20),
            dt("2024-01-05T20:00:00")
        );
    }

    #[test]
    fn before_cutoff_closes_at_invocation_time() {
        // invoked at 15:00 -> sessions close at 15:00, never in the future
        assert_eq!(
            effective_cutoff(dt("2024-01-05T15:00:00"), 20),
            dt("2024-01-05T15:00:00")
        );
    }

    #[test]
    fn exactly_at_cutoff_uses_cutoff() {
        assert_eq!(
            effective_cutoff(dt("2024-01-05T20:00:00"), 20),
            dt("2024-01-05T20:00:00")
        );
    }
}
