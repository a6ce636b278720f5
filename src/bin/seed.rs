use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use log::info;
use std::env;

use vacanza::config::{create_pool, initialize_schema};
use vacanza::logger::setup_logger;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    setup_logger();

    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| "vacanza.db".to_string());
    info!("Seeding database: {}", db_url);

    let mut conn = SqliteConnection::establish(&db_url)
        .expect("Failed to establish connection for schema initialization");
    initialize_schema(&mut conn)
        .expect("Failed to execute database initialization script");

    let pool = create_pool(&db_url)
        .expect("Failed to create database connection pool");

    let report = vacanza::seed::run(&pool).await.expect("Seeding failed");
    info!(
        "Done. Inserted or updated: {}, skipped: {}",
        report.inserted, report.skipped
    );

    Ok(())
}
