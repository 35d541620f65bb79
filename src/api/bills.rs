use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::MySqlPool;
use tracing::error;

use crate::{auth::auth::AuthUser, billing, error::AppError, model::bill::Bill};

fn csv_response(filename: &str, body: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(body)
}

fn write_user_bills_csv(hourly_rate: Decimal, bills: &[Bill]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "Month",
        "Total Hours",
        "Total Amount",
        "Generated At",
        "Hourly Rate",
    ])?;

    for bill in bills {
        writer.write_record([
            bill.month.format("%B %Y").to_string(),
            bill.total_hours.to_string(),
            bill.total_amount.to_string(),
            bill.generated_at.format("%Y-%m-%d %H:%M").to_string(),
            hourly_rate.to_string(),
        ])?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

/// All of the calling user's bills as CSV, newest month first.
#[utoipa::path(
    get,
    path = "/api/v1/bills/export",
    responses(
        (status = 200, description = "CSV of the user's bills", body = String, content_type = "text/csv"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Bills"
)]
pub async fn export_my_bills(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let rate = billing::hourly_rate(pool.get_ref(), auth.user_id).await?;
    let bills = billing::bills_for_user(pool.get_ref(), auth.user_id).await?;

    let body = write_user_bills_csv(rate, &bills).map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to write bills CSV");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(csv_response(&format!("{}_bills.csv", auth.username), body))
}

#[derive(sqlx::FromRow)]
struct BillExportRow {
    username: String,
    month: chrono::NaiveDate,
    total_hours: Decimal,
    total_amount: Decimal,
    hourly_rate: Decimal,
    generated_at: NaiveDateTime,
}

fn write_month_bills_csv(rows: &[BillExportRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "User",
        "Month",
        "Total Hours",
        "Total Amount",
        "Hourly Rate",
        "Generated At",
    ])?;

    for row in rows {
        writer.write_record([
            row.username.clone(),
            row.month.format("%B %Y").to_string(),
            row.total_hours.to_string(),
            row.total_amount.to_string(),
            row.hourly_rate.to_string(),
            row.generated_at.format("%Y-%m-%d %H:%M").to_string(),
        ])?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

/// All users' bills for a month as CSV; admin only.
#[utoipa::path(
    get,
    path = "/api/v1/admin/bills/export",
    params(crate::api::admin::PeriodQuery),
    responses(
        (status = 200, description = "CSV of all bills for the month", body = String, content_type = "text/csv"),
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
pub async fn export_month_bills(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<crate::clock::SharedClock>,
    query: web::Query<crate::api::admin::PeriodQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let now = clock.now();
    let year = query.year.unwrap_or(chrono::Datelike::year(&now.date()));
    let month = query.month.unwrap_or(chrono::Datelike::month(&now.date()));
    let (month_start, _) = billing::month_bounds(year, month)?;

    let rows = sqlx::query_as::<_, BillExportRow>(
        r#"
        SELECT u.username, b.month, b.total_hours, b.total_amount, u.hourly_rate, b.generated_at
        FROM bills b
        JOIN users u ON u.id = b.user_id
        WHERE b.month = ?
        ORDER BY u.username
        "#,
    )
    .bind(month_start)
    .fetch_all(pool.get_ref())
    .await
    .map_err(AppError::from)?;

    let body = write_month_bills_csv(&rows).map_err(|e| {
        error!(error = %e, "Failed to write month bills CSV");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(csv_response(
        &format!("all_user_bills_{month}_{year}.csv"),
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn user_csv_has_header_and_one_row_per_bill() {
        let bills = vec![Bill {
            id: 1,
            user_id: 7,
            month: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            total_hours: dec!(8.50),
            total_amount: dec!(850.00),
            generated_at: NaiveDate::from_ymd_opt(2024, 1, 31)
                .unwrap()
                .and_hms_opt(17, 30, 0)
                .unwrap(),
        }];

        let body = write_user_bills_csv(dec!(100.00), &bills).unwrap();
        let text = String::from_utf8(body).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Month,Total Hours,Total Amount,Generated At,Hourly Rate");
        assert_eq!(lines[1], "January 2024,8.50,850.00,2024-01-31 17:30,100.00");
    }

    #[test]
    fn month_csv_orders_columns_like_the_header() {
        let rows = vec![BillExportRow {
            username: "jdoe".into(),
            month: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            total_hours: dec!(4.00),
            total_amount: dec!(400.00),
            hourly_rate: dec!(100.00),
            generated_at: NaiveDate::from_ymd_opt(2024, 2, 29)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
        }];

        let body = write_month_bills_csv(&rows).unwrap();
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("User,Month,Total Hours,Total Amount,Hourly Rate,Generated At"));
        assert!(text.contains("jdoe,February 2024,4.00,400.00,100.00,2024-02-29 20:00"));
    }
}
