use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use futures_util::StreamExt;
use log::{debug, error, info};
use serde_json::json;
use std::path::PathBuf;

use crate::config::{AppConfig, DbPool};
use crate::errors::ApiError;
use crate::models::{
    AddCountryRequest, LoginRequest, LoginResponse, NewLike, NewUser, NewVacation,
    RegisterRequest, VacationPayload, MAX_VACATION_PRICE, USER_ROLE_ID,
};
use crate::services::{AuthService, CountryService, LikeService, UserService, VacationService};

/// Registers every route on the given service config. Taking the images
/// directory as a value keeps the closure free of borrows, so the server
/// factory can call it on every worker.
pub fn configure(images_dir: PathBuf) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.service(root_status)
            .service(get_all_countries)
            .service(add_country)
            .service(get_all_vacations)
            .service(add_vacation)
            .service(update_vacation)
            .service(delete_vacation)
            .service(register)
            .service(login)
            // The literal /likes/counts segment must be registered ahead of
            // the /likes/{user_id} matcher or it would never be reached
            .service(get_like_counts)
            .service(get_user_likes)
            .service(like_vacation)
            .service(unlike_vacation)
            .service(upload_image)
            .service(Files::new("/images", images_dir));
    }
}

#[get("/")]
async fn root_status(config: web::Data<AppConfig>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "msg": "Vacanza API running",
        "port": config.port
    }))
}

#[get("/countries")]
async fn get_all_countries(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let countries = CountryService::get_all_countries(&pool).await?;
    debug!("Listed {} countries", countries.len());
    Ok(HttpResponse::Ok().json(countries))
}

#[post("/countries")]
async fn add_country(
    pool: web::Data<DbPool>,
    data: web::Json<AddCountryRequest>,
) -> Result<HttpResponse, ApiError> {
    let name = match &data.country_name {
        None => return Err(ApiError::ValidationError("Country name is required".to_string())),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(ApiError::ValidationError("Country name cannot be empty".to_string()));
            }
            trimmed.to_string()
        }
    };

    let country = CountryService::add_country(&name, &pool).await?;
    Ok(HttpResponse::Created().json(country))
}

#[get("/vacations")]
async fn get_all_vacations(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let vacations = VacationService::get_all_vacations(&pool).await?;
    debug!("Listed {} vacations", vacations.len());
    Ok(HttpResponse::Ok().json(vacations))
}

fn validate_payload(payload: &VacationPayload) -> Result<(), ApiError> {
    if payload.description.trim().is_empty() {
        return Err(ApiError::ValidationError("Description is required".to_string()));
    }

    if !(0.0..=MAX_VACATION_PRICE).contains(&payload.price) {
        return Err(ApiError::ValidationError(format!(
            "Price must be between 0 and {}",
            MAX_VACATION_PRICE
        )));
    }

    if payload.end_date < payload.start_date {
        return Err(ApiError::ValidationError(
            "end_date must not be before start_date".to_string(),
        ));
    }

    Ok(())
}

#[post("/vacations")]
async fn add_vacation(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    payload: web::Json<VacationPayload>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    AuthService::authenticate(&req, &config)?;
    validate_payload(&payload)?;

    let record = NewVacation::from(payload.into_inner());
    let vacation_id = VacationService::add_vacation(record, &pool).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "vacation_id": vacation_id,
        "message": "Vacation added successfully"
    })))
}

#[put("/vacations/{vacation_id}")]
async fn update_vacation(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    payload: web::Json<VacationPayload>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    AuthService::authenticate(&req, &config)?;
    validate_payload(&payload)?;

    let vacation_id = path.into_inner();
    let record = NewVacation::from(payload.into_inner());
    VacationService::update_vacation(vacation_id, record, &pool).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Vacation updated successfully"
    })))
}

#[delete("/vacations/{vacation_id}")]
async fn delete_vacation(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    AuthService::authenticate(&req, &config)?;

    let vacation_id = path.into_inner();
    VacationService::delete_vacation(vacation_id, &pool).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Vacation deleted successfully"
    })))
}

#[post("/register")]
async fn register(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    data: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Registration attempt for: {}", data.email);

    if data.first_name.trim().is_empty()
        || data.last_name.trim().is_empty()
        || data.email.trim().is_empty()
        || data.password.is_empty()
    {
        return Err(ApiError::ValidationError("All fields are required".to_string()));
    }

    let password_hash = AuthService::hash_password(&data.password)?;
    let new_user = NewUser {
        first_name: data.first_name.trim().to_string(),
        last_name: data.last_name.trim().to_string(),
        email: data.email.trim().to_string(),
        password_hash,
        role_id: USER_ROLE_ID,
    };

    let user_id = UserService::create_user(new_user, &pool).await?;
    let user = UserService::get_user_by_id(user_id, &pool).await?;

    // Issue a token right away so the client skips a separate login
    let token = AuthService::generate_token(&user, &config)?;

    info!("User {} registered successfully", user.email);

    Ok(HttpResponse::Created().json(LoginResponse {
        token,
        user_id: user.user_id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        role_id: user.role_id,
    }))
}

#[post("/login")]
async fn login(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    data: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Login attempt for user: {}", data.email);

    // Find user by email
    let user = match UserService::get_user_by_email(&data.email, &pool).await? {
        Some(user) => user,
        None => {
            debug!("Login failed: User not found with email {}", data.email);
            return Err(ApiError::AuthError("Invalid credentials".to_string()));
        }
    };

    // Verify password
    let valid = AuthService::verify_password(&data.password, &user.password_hash)?;
    if !valid {
        debug!("Login failed: Invalid password for user {}", data.email);
        return Err(ApiError::AuthError("Invalid credentials".to_string()));
    }

    // Generate JWT token
    let token = AuthService::generate_token(&user, &config)?;

    info!("User {} logged in successfully", user.email);

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user_id: user.user_id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        role_id: user.role_id,
    }))
}

#[get("/likes/counts")]
async fn get_like_counts(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let counts = LikeService::counts_per_vacation(&pool).await?;
    Ok(HttpResponse::Ok().json(counts))
}

#[get("/likes/{user_id}")]
async fn get_user_likes(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let liked = LikeService::likes_for_user(user_id, &pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "liked_vacations": liked })))
}

#[post("/likes")]
async fn like_vacation(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    data: web::Json<NewLike>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    AuthService::authenticate(&req, &config)?;

    LikeService::add_like(data.into_inner(), &pool).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Vacation liked"
    })))
}

#[delete("/likes")]
async fn unlike_vacation(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    data: web::Json<NewLike>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    AuthService::authenticate(&req, &config)?;

    LikeService::remove_like(data.into_inner(), &pool).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Vacation unliked"
    })))
}

/// Reduces an uploaded filename to a safe basename: path separators and
/// parent references are stripped, anything outside [A-Za-z0-9._-] becomes
/// an underscore. Returns None when nothing usable is left.
fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        None
    } else {
        Some(cleaned)
    }
}

#[post("/upload-image")]
async fn upload_image(
    config: web::Data<AppConfig>,
    mut payload: Multipart,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    // Presence of a bearer token is all this endpoint checks
    AuthService::bearer_token(&req)?;

    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            debug!("Rejected multipart payload: {}", e);
            ApiError::ValidationError("Invalid multipart payload".to_string())
        })?;

        if field.name() != "file" {
            // Drain the unwanted part so the stream can advance
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| {
                    debug!("Rejected multipart payload: {}", e);
                    ApiError::ValidationError("Invalid multipart payload".to_string())
                })?;
            }
            continue;
        }

        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_owned)
            .unwrap_or_default();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| {
                error!("Failed to read uploaded file: {}", e);
                ApiError::InternalError("Failed to read uploaded file".to_string())
            })?;
            bytes.extend_from_slice(&chunk);
        }

        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload
        .ok_or_else(|| ApiError::ValidationError("No file part in the request".to_string()))?;

    if filename.is_empty() {
        return Err(ApiError::ValidationError("No selected file".to_string()));
    }

    let filename = sanitize_filename(&filename)
        .ok_or_else(|| ApiError::ValidationError("No selected file".to_string()))?;

    let images_dir = config.images_dir.clone();
    let saved_name = filename.clone();
    web::block(move || {
        std::fs::create_dir_all(&images_dir)?;
        std::fs::write(images_dir.join(&saved_name), &bytes)
    })
    .await
    .map_err(|e| {
        error!("Blocking operation error: {}", e);
        ApiError::InternalError(e.to_string())
    })?
    .map_err(|e| {
        error!("Failed to save uploaded image: {}", e);
        ApiError::InternalError("Failed to save image".to_string())
    })?;

    info!("Stored uploaded image: {}", filename);

    Ok(HttpResponse::Ok().json(json!({
        "filename": filename,
        "url": format!("/images/{}", filename)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn sanitize_keeps_ordinary_names() {
        assert_eq!(sanitize_filename("thailand.webp"), Some("thailand.webp".to_string()));
        assert_eq!(sanitize_filename("venice-2026_1.jpg"), Some("venice-2026_1.jpg".to_string()));
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), Some("passwd".to_string()));
        assert_eq!(sanitize_filename("/var/tmp/x.png"), Some("x.png".to_string()));
        assert_eq!(sanitize_filename("C:\\images\\x.png"), Some("x.png".to_string()));
    }

    #[test]
    fn sanitize_replaces_odd_characters() {
        assert_eq!(sanitize_filename("my photo (1).png"), Some("my_photo__1_.png".to_string()));
        assert_eq!(sanitize_filename("caf\u{e9}.png"), Some("caf_.png".to_string()));
    }

    #[test]
    fn sanitize_drops_leading_dots() {
        assert_eq!(sanitize_filename(".hidden.png"), Some("hidden.png".to_string()));
        assert_eq!(sanitize_filename("..."), None);
    }

    #[test]
    fn sanitize_rejects_names_with_no_substance() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("???"), None);
        assert_eq!(sanitize_filename("/"), None);
    }

    fn payload(price: f64, start: (i32, u32, u32), end: (i32, u32, u32)) -> VacationPayload {
        VacationPayload {
            country_id: 1,
            destination: "Venice".to_string(),
            description: "Relaxation in Italy".to_string(),
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            price,
            image_filename: "venice.webp".to_string(),
        }
    }

    #[test]
    fn payload_validation_accepts_boundary_prices() {
        assert!(validate_payload(&payload(0.0, (2026, 8, 1), (2026, 8, 10))).is_ok());
        assert!(validate_payload(&payload(10_000.0, (2026, 8, 1), (2026, 8, 10))).is_ok());
    }

    #[test]
    fn payload_validation_rejects_out_of_range_prices() {
        assert!(validate_payload(&payload(-0.01, (2026, 8, 1), (2026, 8, 10))).is_err());
        assert!(validate_payload(&payload(10_000.01, (2026, 8, 1), (2026, 8, 10))).is_err());
        assert!(validate_payload(&payload(f64::NAN, (2026, 8, 1), (2026, 8, 10))).is_err());
    }

    #[test]
    fn payload_validation_rejects_reversed_dates() {
        assert!(validate_payload(&payload(100.0, (2026, 8, 10), (2026, 8, 1))).is_err());
    }

    #[test]
    fn payload_validation_accepts_single_day_trips() {
        assert!(validate_payload(&payload(100.0, (2026, 8, 1), (2026, 8, 1))).is_ok());
    }

    #[test]
    fn payload_validation_requires_description() {
        let mut p = payload(100.0, (2026, 8, 1), (2026, 8, 10));
        p.description = "   ".to_string();
        assert!(validate_payload(&p).is_err());
    }
}
