use actix_web::{HttpResponse, Responder, web};
use sqlx::MySqlPool;

use crate::{auth::auth::AuthUser, clock::SharedClock, error::AppError, session};

/// User dashboard: today's record, the month's records, current and last
/// month bills (both refreshed on this read) and live hours for an open
/// session.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Dashboard data", body = crate::session::Dashboard),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn get_dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<SharedClock>,
) -> Result<impl Responder, AppError> {
    let dashboard =
        session::dashboard(pool.get_ref(), clock.get_ref().as_ref(), auth.user_id).await?;

    Ok(HttpResponse::Ok().json(dashboard))
}
