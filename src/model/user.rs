use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Public projection of a user row; never carries the password hash.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,

    #[schema(example = "100.00", value_type = String)]
    pub hourly_rate: Decimal,

    pub is_admin: bool,
}
