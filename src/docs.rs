use utoipa::OpenApi;

use crate::api::admin::{AdminSummary, PeriodQuery};
use crate::model::{attendance::Attendance, bill::Bill, user::User};
use crate::models::{LoginReqDto, RegisterReq};
use crate::session::Dashboard;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timebill API",
        version = "1.0.0",
        description = r#"
## Attendance & Billing Tracker

Users check in and out; worked hours accrue into monthly bills priced at each
user's hourly rate. Admins see aggregate statistics and export bill reports.

### Key Features
- **Attendance**
  - One check-in/check-out session per user per day
- **Billing**
  - Monthly bills recomputed from the attendance ledger on every access
- **Dashboard**
  - Live hours for an open session, current and last month bills
- **Admin**
  - Monthly summaries, CSV exports, manual forced-checkout sweep

### Security
Protected endpoints use **JWT Bearer authentication**; admin endpoints
require the admin flag.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,

        crate::api::dashboard::get_dashboard,

        crate::api::bills::export_my_bills,
        crate::api::bills::export_month_bills,

        crate::api::admin::summary,
        crate::api::admin::sweep_now
    ),
    components(
        schemas(
            Attendance,
            Bill,
            User,
            Dashboard,
            AdminSummary,
            PeriodQuery,
            RegisterReq,
            LoginReqDto
        )
    ),
    tags(
        (name = "Attendance", description = "Check-in/check-out APIs"),
        (name = "Dashboard", description = "Per-user dashboard"),
        (name = "Bills", description = "Bill export APIs"),
        (name = "Admin", description = "Aggregate statistics and maintenance"),
    )
)]
pub struct ApiDoc;
