use actix_web::{HttpResponse, Responder, web};
use chrono::Datelike;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    billing,
    clock::SharedClock,
    error::AppError,
    ledger,
    model::{attendance::Attendance, bill::Bill, user::User},
    sweeper,
};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PeriodQuery {
    #[schema(example = 2024)]
    pub year: Option<i32>,

    #[schema(example = 1)]
    pub month: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AdminSummary {
    #[schema(example = "01/2024")]
    pub selected_month: String,

    pub users: Vec<User>,
    pub attendances: Vec<Attendance>,
    pub bills: Vec<Bill>,

    #[schema(example = "320.00", value_type = String)]
    pub total_hours: Decimal,

    #[schema(example = "32000.00", value_type = String)]
    pub total_amount: Decimal,
}

/// Users whose bill must be refreshed for the month: anyone with attendance
/// in it, plus anyone with a stored bill row. The union covers a bill left
/// stale by a failed upsert after a committed check-out.
fn billable_user_ids(attendances: &[Attendance], bills: &[Bill]) -> Vec<u64> {
    let mut ids: Vec<u64> = attendances
        .iter()
        .map(|a| a.user_id)
        .chain(bills.iter().map(|b| b.user_id))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

async fn list_users(pool: &MySqlPool) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, username, email, hourly_rate, is_admin FROM users ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Monthly summary across all users. Every stored bill for the month is
/// refreshed from the ledger before the totals are summed, so the totals
/// always equal the sum of the individual bills shown.
#[utoipa::path(
    get,
    path = "/api/v1/admin/summary",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Aggregate month summary", body = AdminSummary),
        (status = 400, description = "Invalid month or year"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<SharedClock>,
    query: web::Query<PeriodQuery>,
) -> Result<impl Responder, AppError> {
    auth.require_admin()?;

    let now = clock.now();
    let year = query.year.unwrap_or(now.date().year());
    let month = query.month.unwrap_or(now.date().month());
    let (month_start, next_month_start) = billing::month_bounds(year, month)?;

    let users = list_users(pool.get_ref()).await?;
    let attendances =
        ledger::month_records_all_users(pool.get_ref(), month_start, next_month_start).await?;

    let stored = billing::bills_for_month(pool.get_ref(), month_start).await?;

    let mut bills = Vec::new();
    for user_id in billable_user_ids(&attendances, &stored) {
        let bill = billing::get_or_create_bill(pool.get_ref(), user_id, month_start, now).await?;
        bills.push(bill);
    }

    let (total_hours, total_amount) = billing::sum_bills(&bills);

    Ok(HttpResponse::Ok().json(AdminSummary {
        selected_month: format!("{month:02}/{year}"),
        users,
        attendances,
        bills,
        total_hours,
        total_amount,
    }))
}

/// Manual sweep trigger: runs one forced-checkout pass immediately.
#[utoipa::path(
    post,
    path = "/api/v1/admin/sweep",
    responses(
        (status = 200, description = "Sweep completed", body = Object, example = json!({
            "closed": 3
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn sweep_now(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<SharedClock>,
    config: web::Data<crate::config::Config>,
) -> Result<impl Responder, AppError> {
    auth.require_admin()?;

    let closed = sweeper::sweep(pool.get_ref(), clock.now(), config.checkout_cutoff_hour).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "closed": closed })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn attendance(user_id: u64) -> Attendance {
        let check_in = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Attendance {
            id: user_id,
            user_id,
            session_date: check_in.date(),
            check_in,
            check_out: None,
        }
    }

    fn bill(user_id: u64) -> Bill {
        Bill {
            id: user_id,
            user_id,
            month: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            total_hours: dec!(0.00),
            total_amount: dec!(0.00),
            generated_at: NaiveDate::from_ymd_opt(2024, 1, 31)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn refresh_set_unions_attendance_and_stored_bills() {
        // user 3 checked out but their bill upsert never landed; the
        // attendance row alone must still put them in the refresh set
        let attendances = vec![attendance(3), attendance(1), attendance(1)];
        let bills = vec![bill(1), bill(2)];
        assert_eq!(billable_user_ids(&attendances, &bills), vec![1, 2, 3]);
    }

    #[test]
    fn refresh_set_is_empty_for_an_idle_month() {
        assert!(billable_user_ids(&[], &[]).is_empty());
    }
}
