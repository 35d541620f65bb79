use actix_web::{HttpResponse, Responder, web};
use sqlx::MySqlPool;

use crate::{auth::auth::AuthUser, clock::SharedClock, error::AppError, session};

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully"
        })),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "error": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<SharedClock>,
) -> Result<impl Responder, AppError> {
    let record = session::check_in(pool.get_ref(), clock.get_ref().as_ref(), auth.user_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Checked in successfully",
        "attendance": record
    })))
}

/// Check-out endpoint: closes the given record and returns it together with
/// the freshly recomputed bill for that month.
#[utoipa::path(
    put,
    path = "/api/v1/attendance/{id}/check-out",
    params(
        ("id", description = "Attendance record ID")
    ),
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Check-out successful",
            "hours_worked": "8.50"
        })),
        (status = 400, description = "Already checked out", body = Object, example = json!({
            "error": "Already checked out"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Record belongs to another user"),
        (status = 404, description = "No such attendance record"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<SharedClock>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    let record_id = path.into_inner();

    let (record, bill) = session::check_out(
        pool.get_ref(),
        clock.get_ref().as_ref(),
        record_id,
        auth.user_id,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Check-out successful",
        "attendance": record,
        "bill": bill,
        "hours_worked": record.hours_worked()
    })))
}
