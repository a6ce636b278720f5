use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use diesel::prelude::*;

// Role ids are fixed by the schema bootstrap and referenced all over the app.
pub const ADMIN_ROLE_ID: i32 = 1;
pub const USER_ROLE_ID: i32 = 2;

// Upper bound accepted for a vacation price, inclusive.
pub const MAX_VACATION_PRICE: f64 = 10_000.0;

#[derive(Queryable, Serialize, Debug)]
pub struct Role {
    pub role_id: i32,
    pub role_name: String,
}

#[derive(Queryable, Serialize, Debug, Clone)]
pub struct User {
    pub user_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: i32,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: i32,
}

#[derive(Queryable, Serialize, Debug)]
pub struct Country {
    pub country_id: i32,
    pub country_name: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::countries)]
pub struct NewCountry {
    pub country_name: String,
}

#[derive(Queryable, Serialize, Debug)]
pub struct Vacation {
    pub vacation_id: i32,
    pub country_id: i32,
    pub destination: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price: f64,
    pub image_filename: String,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::vacations)]
pub struct NewVacation {
    pub country_id: i32,
    pub destination: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price: f64,
    pub image_filename: String,
}

/// Vacation row joined with its country name, as returned by the listing
/// endpoint. The country side of the join is nullable so rows survive a
/// missing country instead of disappearing from the list.
#[derive(Queryable, Serialize, Debug)]
pub struct VacationWithCountry {
    pub vacation_id: i32,
    pub country_id: i32,
    pub destination: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price: f64,
    pub image_filename: String,
    pub country_name: Option<String>,
}

#[derive(Queryable, Serialize, Debug)]
pub struct Like {
    pub user_id: i32,
    pub vacation_id: i32,
}

#[derive(Insertable, Deserialize, Debug, Clone, Copy)]
#[diesel(table_name = crate::schema::likes)]
pub struct NewLike {
    pub user_id: i32,
    pub vacation_id: i32,
}

// DTOs
#[derive(Deserialize, Debug)]
pub struct AddCountryRequest {
    pub country_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct VacationPayload {
    pub country_id: i32,
    pub destination: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price: f64,
    pub image_filename: String,
}

impl From<VacationPayload> for NewVacation {
    fn from(payload: VacationPayload) -> Self {
        NewVacation {
            country_id: payload.country_id,
            destination: payload.destination.trim().to_string(),
            description: payload.description.trim().to_string(),
            start_date: payload.start_date,
            end_date: payload.end_date,
            price: payload.price,
            image_filename: payload.image_filename.trim().to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role_id: i32,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String,      // Subject (user_id)
    pub exp: usize,       // Expiration time
    pub iat: usize,       // Issued at
    pub user_id: i32,
    pub email: String,
    pub role_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacation_payload_trims_text_fields() {
        let payload = VacationPayload {
            country_id: 3,
            destination: "  Paris  ".to_string(),
            description: " Wine tasting in France ".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(),
            price: 1800.0,
            image_filename: "france.jpeg ".to_string(),
        };

        let record = NewVacation::from(payload);
        assert_eq!(record.destination, "Paris");
        assert_eq!(record.description, "Wine tasting in France");
        assert_eq!(record.image_filename, "france.jpeg");
    }

    #[test]
    fn dates_serialize_as_iso_strings() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        assert_eq!(serde_json::to_string(&day).unwrap(), "\"2026-01-10\"");
    }

    #[test]
    fn user_serialization_omits_password_hash() {
        let user = User {
            user_id: 1,
            first_name: "Laura".to_string(),
            last_name: "Admin".to_string(),
            email: "laura-admin@johnbryce.com".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            role_id: ADMIN_ROLE_ID,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(json.contains("laura-admin@johnbryce.com"));
    }
}
