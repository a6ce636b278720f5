use crate::config::{AppConfig, DbPool};
use crate::errors::ApiError;
use crate::models::*;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, HttpRequest};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::Text;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error, info};
use std::collections::BTreeMap;

diesel::define_sql_function! {
    /// SQLite's built-in lower(), for case-insensitive lookups.
    fn lower(x: Text) -> Text;
}

// Seeded in insertion order, so Italy gets id 1 and Thailand id 10.
pub const DEFAULT_COUNTRIES: [&str; 10] = [
    "Italy", "Spain", "France", "Greece", "Japan",
    "Argentina", "Brazil", "Mexico", "Portugal", "Thailand",
];

pub struct AuthService;

impl AuthService {
    pub fn hash_password(password: &str) -> Result<String, ApiError> {
        hash(password, DEFAULT_COST)
            .map_err(|e| {
                error!("Failed to hash password: {}", e);
                ApiError::InternalError("Failed to hash password".to_string())
            })
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
        verify(password, hash)
            .map_err(|e| {
                error!("Failed to verify password: {}", e);
                ApiError::InternalError("Failed to verify password".to_string())
            })
    }

    pub fn generate_token(user: &User, config: &AppConfig) -> Result<String, ApiError> {
        let now = Utc::now();
        let iat = now.timestamp() as usize;
        let exp = (now + Duration::hours(config.jwt_expiry)).timestamp() as usize;

        let claims = Claims {
            sub: user.user_id.to_string(),
            exp,
            iat,
            user_id: user.user_id,
            email: user.email.clone(),
            role_id: user.role_id,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes())
        )
        .map_err(|e| {
            error!("Failed to generate token: {}", e);
            ApiError::InternalError("Failed to generate token".to_string())
        })
    }

    pub fn decode_token(token: &str, config: &AppConfig) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256)
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("Rejected token: {}", e);
            ApiError::AuthError("Invalid or expired token".to_string())
        })
    }

    /// Pulls the token out of the Authorization header without validating
    /// it. The upload endpoint only checks that a bearer token is present.
    pub fn bearer_token(req: &HttpRequest) -> Result<String, ApiError> {
        req.headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .map(|token| token.to_string())
            .ok_or_else(|| {
                ApiError::AuthError("Authorization header missing or invalid".to_string())
            })
    }

    pub fn authenticate(req: &HttpRequest, config: &AppConfig) -> Result<Claims, ApiError> {
        let token = Self::bearer_token(req)?;
        Self::decode_token(&token, config)
    }
}

pub struct RoleService;

impl RoleService {
    pub async fn insert_default_roles(pool: &DbPool) -> Result<(), ApiError> {
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        web::block(move || {
            use crate::schema::roles::dsl::*;
            let mut conn = conn;
            diesel::insert_into(roles)
                .values(&vec![
                    (role_id.eq(ADMIN_ROLE_ID), role_name.eq("Admin")),
                    (role_id.eq(USER_ROLE_ID), role_name.eq("User")),
                ])
                .on_conflict_do_nothing()
                .execute(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| {
            error!("Failed to insert default roles: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }
}

pub struct UserService;

impl UserService {
    pub async fn get_user_by_email(email_addr: &str, pool: &DbPool) -> Result<Option<User>, ApiError> {
        let email_copy = email_addr.to_string();
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let user = web::block(move || {
            use crate::schema::users::dsl::*;
            let mut conn = conn;
            users
                .filter(email.eq(email_copy))
                .first::<User>(&mut conn)
                .optional()
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| {
            error!("Error finding user by email: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?;

        Ok(user)
    }

    pub async fn get_user_by_id(id: i32, pool: &DbPool) -> Result<User, ApiError> {
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let user = web::block(move || {
            use crate::schema::users::dsl::*;
            let mut conn = conn;
            users.find(id).first::<User>(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| {
            debug!("User not found with ID {}: {}", id, e);
            ApiError::NotFoundError("User not found".to_string())
        })?;

        Ok(user)
    }

    /// Inserts the user and returns its id. The unique index on email is the
    /// single source of truth for duplicates, so there is no lookup first.
    pub async fn create_user(new_user: NewUser, pool: &DbPool) -> Result<i32, ApiError> {
        let email_copy = new_user.email.clone();
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let id = web::block(move || {
            use crate::schema::users::dsl::*;
            let mut conn = conn;
            diesel::insert_into(users)
                .values(&new_user)
                .returning(user_id)
                .get_result::<i32>(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                debug!("Attempted to create user with existing email: {}", email_copy);
                ApiError::ConflictError("Email already exists".to_string())
            }
            _ => {
                error!("Failed to create user: {}", e);
                ApiError::DatabaseError(e.to_string())
            }
        })?;

        info!("Created new user with ID: {}", id);
        Ok(id)
    }

    pub async fn update_user(id: i32, changes: NewUser, pool: &DbPool) -> Result<(), ApiError> {
        let email_copy = changes.email.clone();
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let updated = web::block(move || {
            use crate::schema::users::dsl::*;
            let mut conn = conn;
            diesel::update(users.find(id))
                .set(&changes)
                .execute(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                debug!("Update would reuse an existing email: {}", email_copy);
                ApiError::ConflictError("Email already exists".to_string())
            }
            _ => {
                error!("Failed to update user {}: {}", id, e);
                ApiError::DatabaseError(e.to_string())
            }
        })?;

        if updated == 0 {
            debug!("Attempted to update non-existent user ID: {}", id);
            return Err(ApiError::NotFoundError("User not found".to_string()));
        }

        Ok(())
    }
}

pub struct CountryService;

impl CountryService {
    pub async fn get_all_countries(pool: &DbPool) -> Result<Vec<Country>, ApiError> {
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let rows = web::block(move || {
            use crate::schema::countries::dsl::*;
            let mut conn = conn;
            countries
                .order(country_id.asc())
                .load::<Country>(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| {
            error!("Failed to load countries: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?;

        Ok(rows)
    }

    /// Inserts the country and returns the stored row. Duplicate names are
    /// reported by the unique index, never by a prior existence check.
    pub async fn add_country(name: &str, pool: &DbPool) -> Result<Country, ApiError> {
        let new_country = NewCountry { country_name: name.to_string() };
        let name_copy = name.to_string();
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let country = web::block(move || {
            use crate::schema::countries::dsl::*;
            let mut conn = conn;
            diesel::insert_into(countries)
                .values(&new_country)
                .returning((country_id, country_name))
                .get_result::<Country>(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                debug!("Attempted to add duplicate country: {}", name_copy);
                ApiError::ConflictError(format!("Country '{}' already exists", name_copy))
            }
            _ => {
                error!("Failed to add country: {}", e);
                ApiError::DatabaseError(e.to_string())
            }
        })?;

        info!("Added country '{}' with ID: {}", country.country_name, country.country_id);
        Ok(country)
    }

    pub async fn insert_default_countries(pool: &DbPool) -> Result<(), ApiError> {
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        web::block(move || {
            use crate::schema::countries::dsl::*;
            let mut conn = conn;
            for name in DEFAULT_COUNTRIES {
                diesel::insert_into(countries)
                    .values(country_name.eq(name))
                    .on_conflict(country_name)
                    .do_nothing()
                    .execute(&mut conn)?;
            }
            diesel::QueryResult::Ok(())
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| {
            error!("Failed to insert default countries: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }
}

pub struct VacationService;

impl VacationService {
    pub async fn get_all_vacations(pool: &DbPool) -> Result<Vec<VacationWithCountry>, ApiError> {
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let rows = web::block(move || {
            use crate::schema::countries::dsl::{countries, country_name};
            use crate::schema::vacations::dsl::*;
            let mut conn = conn;
            vacations
                .left_join(countries)
                .select((
                    vacation_id,
                    country_id,
                    destination,
                    description,
                    start_date,
                    end_date,
                    price,
                    image_filename,
                    country_name.nullable(),
                ))
                .order(vacation_id.asc())
                .load::<VacationWithCountry>(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| {
            error!("Failed to load vacations: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?;

        Ok(rows)
    }

    pub async fn add_vacation(record: NewVacation, pool: &DbPool) -> Result<i32, ApiError> {
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let id = web::block(move || {
            use crate::schema::vacations::dsl::*;
            let mut conn = conn;
            diesel::insert_into(vacations)
                .values(&record)
                .returning(vacation_id)
                .get_result::<i32>(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                debug!("Vacation insert referenced a missing country");
                ApiError::ValidationError("country_id does not match an existing country".to_string())
            }
            _ => {
                error!("Failed to add vacation: {}", e);
                ApiError::DatabaseError(e.to_string())
            }
        })?;

        info!("Added vacation with ID: {}", id);
        Ok(id)
    }

    pub async fn update_vacation(id: i32, changes: NewVacation, pool: &DbPool) -> Result<(), ApiError> {
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let updated = web::block(move || {
            use crate::schema::vacations::dsl::*;
            let mut conn = conn;
            diesel::update(vacations.find(id))
                .set(&changes)
                .execute(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                debug!("Vacation update referenced a missing country");
                ApiError::ValidationError("country_id does not match an existing country".to_string())
            }
            _ => {
                error!("Failed to update vacation {}: {}", id, e);
                ApiError::DatabaseError(e.to_string())
            }
        })?;

        if updated == 0 {
            debug!("Attempted to update non-existent vacation ID: {}", id);
            return Err(ApiError::NotFoundError("Vacation not found".to_string()));
        }

        info!("Updated vacation with ID: {}", id);
        Ok(())
    }

    pub async fn delete_vacation(id: i32, pool: &DbPool) -> Result<(), ApiError> {
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let deleted = web::block(move || {
            use crate::schema::vacations::dsl::*;
            let mut conn = conn;
            diesel::delete(vacations.find(id)).execute(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| {
            error!("Failed to delete vacation {}: {}", id, e);
            ApiError::DatabaseError(e.to_string())
        })?;

        if deleted == 0 {
            debug!("Attempted to delete non-existent vacation ID: {}", id);
            return Err(ApiError::NotFoundError("Vacation not found".to_string()));
        }

        info!("Deleted vacation with ID: {}", id);
        Ok(())
    }

    pub async fn find_by_description(desc: &str, pool: &DbPool) -> Result<Option<Vacation>, ApiError> {
        let needle = desc.to_lowercase();
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let vacation = web::block(move || {
            use crate::schema::vacations::dsl::*;
            let mut conn = conn;
            vacations
                .filter(lower(description).eq(needle))
                .first::<Vacation>(&mut conn)
                .optional()
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| {
            error!("Error finding vacation by description: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?;

        Ok(vacation)
    }
}

pub struct LikeService;

impl LikeService {
    /// The composite primary key rejects repeat likes and the foreign keys
    /// reject unknown ids, so the insert itself is the only check.
    pub async fn add_like(like: NewLike, pool: &DbPool) -> Result<(), ApiError> {
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        web::block(move || {
            use crate::schema::likes::dsl::*;
            let mut conn = conn;
            diesel::insert_into(likes)
                .values(&like)
                .execute(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                debug!("User {} already liked vacation {}", like.user_id, like.vacation_id);
                ApiError::ConflictError("Vacation already liked by this user".to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                debug!(
                    "Like referenced missing user {} or vacation {}",
                    like.user_id, like.vacation_id
                );
                ApiError::NotFoundError("User or vacation not found".to_string())
            }
            _ => {
                error!("Failed to add like: {}", e);
                ApiError::DatabaseError(e.to_string())
            }
        })?;

        info!("User {} liked vacation {}", like.user_id, like.vacation_id);
        Ok(())
    }

    pub async fn remove_like(like: NewLike, pool: &DbPool) -> Result<(), ApiError> {
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let deleted = web::block(move || {
            use crate::schema::likes::dsl::*;
            let mut conn = conn;
            diesel::delete(
                likes
                    .filter(user_id.eq(like.user_id))
                    .filter(vacation_id.eq(like.vacation_id)),
            )
            .execute(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| {
            error!("Failed to remove like: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?;

        if deleted == 0 {
            debug!(
                "No like to remove for user {} and vacation {}",
                like.user_id, like.vacation_id
            );
            return Err(ApiError::NotFoundError("Like not found".to_string()));
        }

        info!("User {} unliked vacation {}", like.user_id, like.vacation_id);
        Ok(())
    }

    /// Counts grouped by vacation; vacations nobody liked are absent.
    pub async fn counts_per_vacation(pool: &DbPool) -> Result<BTreeMap<i32, i64>, ApiError> {
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let rows = web::block(move || {
            use crate::schema::likes::dsl::*;
            let mut conn = conn;
            likes
                .group_by(vacation_id)
                .select((vacation_id, diesel::dsl::count_star()))
                .load::<(i32, i64)>(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| {
            error!("Failed to count likes: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?;

        Ok(rows.into_iter().collect())
    }

    pub async fn likes_for_user(user: i32, pool: &DbPool) -> Result<Vec<i32>, ApiError> {
        let conn = pool.get()
            .map_err(|e| {
                error!("Failed to get database connection: {}", e);
                ApiError::DatabaseError(e.to_string())
            })?;

        let ids = web::block(move || {
            use crate::schema::likes::dsl::*;
            let mut conn = conn;
            likes
                .filter(user_id.eq(user))
                .select(vacation_id)
                .order(vacation_id.asc())
                .load::<i32>(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Database operation error: {}", e);
            ApiError::DatabaseError(e.to_string())
        })?
        .map_err(|e| {
            error!("Failed to load likes for user {}: {}", user, e);
            ApiError::DatabaseError(e.to_string())
        })?;

        Ok(ids)
    }
}
