use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use tempfile::TempDir;

use vacanza::config::{create_pool, initialize_schema, AppConfig, DbPool};
use vacanza::models::{NewUser, USER_ROLE_ID};
use vacanza::services::{AuthService, UserService};

/// A throwaway database and images directory for one test. The temp
/// directory lives as long as the struct, everything in it disappears on
/// drop. The database is a real file because every pooled connection must
/// see the same data, which in-memory SQLite does not provide.
#[allow(dead_code)]
pub struct TestApp {
    pub pool: DbPool,
    pub config: AppConfig,
    _dir: TempDir,
}

pub fn setup() -> TestApp {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db_path = dir.path().join("vacanza-test.db");
    let db_url = db_path.to_str().expect("temp path should be utf-8").to_string();

    let mut conn = SqliteConnection::establish(&db_url).expect("open test database");
    initialize_schema(&mut conn).expect("initialize schema");

    let images_dir = dir.path().join("images");
    std::fs::create_dir_all(&images_dir).expect("create images dir");

    let pool = create_pool(&db_url).expect("build pool");
    let config = AppConfig {
        jwt_secret: "test-secret".to_string(),
        jwt_expiry: 1,
        port: 5003,
        images_dir,
    };

    TestApp { pool, config, _dir: dir }
}

/// Creates a regular user straight through the service layer and returns
/// its id and a valid bearer token value. The fixed roles are already in
/// place because the init script inserts them.
#[allow(dead_code)]
pub async fn create_test_user(ctx: &TestApp, email: &str) -> (i32, String) {
    let password_hash = AuthService::hash_password("a-test-password!").expect("hash password");
    let user_id = UserService::create_user(
        NewUser {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            password_hash,
            role_id: USER_ROLE_ID,
        },
        &ctx.pool,
    )
    .await
    .expect("create user");

    let user = UserService::get_user_by_id(user_id, &ctx.pool).await.expect("load user");
    let token = AuthService::generate_token(&user, &ctx.config).expect("generate token");
    (user_id, token)
}
