use rocket_db_pools::{Database, sqlx};

#[derive(Database)]
#[database("mindline_db")]
pub struct MindlineDb(sqlx::PgPool);

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
