use rocket_db_pools::{sqlx, Database};

#[derive(Database)]
#[database("auth_db")]
pub struct AuthDb(sqlx::PgPool);
