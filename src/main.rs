use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use log::{error, info};
use std::env;

use vacanza::config::{create_pool, initialize_schema, AppConfig};
use vacanza::handlers;
use vacanza::logger::setup_logger;
use vacanza::middleware::RequestLogger;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables and initialize logger
    dotenvy::dotenv().ok();
    setup_logger();

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

    // Load and validate configuration
    let config = AppConfig::from_env();
    if let Err(e) = config.validate() {
        error!("Configuration validation error: {}", e);
        panic!("Invalid configuration: {}", e);
    }
    let port = config.port;

    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| "vacanza.db".to_string());
    info!("Connecting to database: {}", db_url);

    // Initialize database schema
    let mut conn = SqliteConnection::establish(&db_url)
        .expect("Failed to establish connection for schema initialization");
    initialize_schema(&mut conn)
        .expect("Failed to execute database initialization script");
    info!("Database initialization complete.");

    // Set up database connection pool
    let pool = create_pool(&db_url)
        .expect("Failed to create database connection pool");

    // Make sure the upload directory is there before anything is served
    std::fs::create_dir_all(&config.images_dir)
        .expect("Failed to create images directory");

    info!("Starting HTTP server at http://{}:{}", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            // Enable request logger middleware
            .wrap(RequestLogger)
            // The UI is served from another origin during development
            .wrap(Cors::permissive())
            // Register app data
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            // API routes
            .configure(handlers::configure(config.images_dir.clone()))
    })
    .workers(2) // Specify number of workers
    .keep_alive(std::time::Duration::from_secs(75)) // Configure keep-alive
    .shutdown_timeout(30) // Graceful shutdown timeout in seconds
    .bind((host, port))?
    .run()
    .await
}
