use chrono::{Datelike, Local, NaiveDate};
use log::{error, info, warn};

use crate::config::DbPool;
use crate::errors::ApiError;
use crate::models::{NewUser, NewVacation, ADMIN_ROLE_ID, MAX_VACATION_PRICE, USER_ROLE_ID};
use crate::services::{AuthService, CountryService, RoleService, UserService, VacationService};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SeedUser {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub role_id: i32,
}

pub const SEED_USERS: [SeedUser; 2] = [
    SeedUser {
        first_name: "Laura",
        last_name: "Admin",
        email: "laura-admin@johnbryce.com",
        password: "@dmin!77",
        role_id: ADMIN_ROLE_ID,
    },
    SeedUser {
        first_name: "Charles",
        last_name: "Kent",
        email: "ckent@gmail.com",
        password: "mypass!!word9",
        role_id: USER_ROLE_ID,
    },
];

pub struct SeedVacation {
    pub country_id: i32,
    pub destination: &'static str,
    pub description: &'static str,
    pub start_date: &'static str,
    pub end_date: &'static str,
    pub price: f64,
    pub image_filename: &'static str,
}

pub const SEED_VACATIONS: [SeedVacation; 12] = [
    SeedVacation { country_id: 10, destination: "Thailand", description: "Beach in Thailand (2026)", start_date: "2026-01-10", end_date: "2026-01-20", price: 1200.0, image_filename: "thailand.webp" },
    SeedVacation { country_id: 2, destination: "Spain", description: "Cultural tour in Spain (2026)", start_date: "2026-02-05", end_date: "2026-02-15", price: 1500.0, image_filename: "spain.jpeg" },
    SeedVacation { country_id: 3, destination: "France", description: "Wine tasting in France (2026)", start_date: "2026-03-01", end_date: "2026-03-08", price: 1800.0, image_filename: "france.jpeg" },
    SeedVacation { country_id: 6, destination: "Argentina", description: "Hiking in Argentina (2026)", start_date: "2026-04-10", end_date: "2026-04-20", price: 950.0, image_filename: "argentina.jpg" },
    SeedVacation { country_id: 4, destination: "Greece", description: "Island hopping in Greece (2026)", start_date: "2026-05-15", end_date: "2026-05-25", price: 2100.0, image_filename: "greece.jpg" },
    SeedVacation { country_id: 7, destination: "Brazil", description: "Adventure in Brazil (2026)", start_date: "2026-06-01", end_date: "2026-06-10", price: 1400.0, image_filename: "brazil.jpg" },
    SeedVacation { country_id: 5, destination: "Japan", description: "Temples in Japan (2026)", start_date: "2026-07-20", end_date: "2026-07-30", price: 3000.0, image_filename: "japan.avif" },
    SeedVacation { country_id: 1, destination: "Italy", description: "Relaxation in Italy (2026)", start_date: "2026-08-01", end_date: "2026-08-10", price: 1600.0, image_filename: "venice.webp" },
    SeedVacation { country_id: 8, destination: "Mexico", description: "Food tour in Mexico (2026)", start_date: "2026-09-15", end_date: "2026-09-25", price: 1000.0, image_filename: "mexico.webp" },
    SeedVacation { country_id: 9, destination: "Portugal", description: "Coastal trip in Portugal (2026)", start_date: "2026-10-01", end_date: "2026-10-12", price: 1100.0, image_filename: "portugal.jpeg" },
    SeedVacation { country_id: 10, destination: "Thailand", description: "Night markets in Thailand (2026)", start_date: "2026-11-05", end_date: "2026-11-15", price: 950.0, image_filename: "thailand.webp" },
    SeedVacation { country_id: 2, destination: "Spain", description: "Art and history in Spain", start_date: "2026-12-20", end_date: "2026-12-30", price: 1250.0, image_filename: "spain.jpeg" },
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Adds whole years to both dates until the start is no longer in the past.
/// Both dates shift by the same number of years. Returns None when a shifted
/// date does not exist in the target year, which only happens for Feb 29.
pub fn roll_to_future(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    let mut start = start;
    let mut end = end;

    while start < today {
        start = NaiveDate::from_ymd_opt(start.year() + 1, start.month(), start.day())?;
        end = NaiveDate::from_ymd_opt(end.year() + 1, end.month(), end.day())?;
    }

    Some((start, end))
}

fn is_valid(description: &str, start: NaiveDate, end: NaiveDate, price: f64) -> bool {
    if !(0.0..=MAX_VACATION_PRICE).contains(&price) {
        warn!("Vacation '{}' has an out-of-range price: {}", description, price);
        return false;
    }

    if end < start {
        warn!(
            "Vacation '{}' ends before it starts: {} to {}",
            description, start, end
        );
        return false;
    }

    true
}

async fn upsert_user(user: &SeedUser, pool: &DbPool) -> Result<(), ApiError> {
    let password_hash = AuthService::hash_password(user.password)?;
    let record = NewUser {
        first_name: user.first_name.to_string(),
        last_name: user.last_name.to_string(),
        email: user.email.to_string(),
        password_hash,
        role_id: user.role_id,
    };

    match UserService::get_user_by_email(user.email, pool).await? {
        Some(existing) => {
            UserService::update_user(existing.user_id, record, pool).await?;
            info!("Updated user: {}", user.email);
        }
        None => {
            UserService::create_user(record, pool).await?;
            info!("Inserted user: {}", user.email);
        }
    }

    Ok(())
}

/// Populates roles, countries, the two demo users and the vacation catalog.
/// Safe to run repeatedly: vacations are matched by description
/// (case-insensitive) and refreshed in place rather than duplicated.
pub async fn run(pool: &DbPool) -> Result<SeedReport, ApiError> {
    RoleService::insert_default_roles(pool).await?;
    CountryService::insert_default_countries(pool).await?;

    for user in &SEED_USERS {
        upsert_user(user, pool).await?;
    }

    let today = Local::now().date_naive();
    let mut report = SeedReport::default();

    for item in &SEED_VACATIONS {
        let start = match NaiveDate::parse_from_str(item.start_date, DATE_FORMAT) {
            Ok(date) => date,
            Err(e) => {
                warn!("Vacation '{}' has an invalid start date: {}", item.description, e);
                report.skipped += 1;
                continue;
            }
        };

        let end = match NaiveDate::parse_from_str(item.end_date, DATE_FORMAT) {
            Ok(date) => date,
            Err(e) => {
                warn!("Vacation '{}' has an invalid end date: {}", item.description, e);
                report.skipped += 1;
                continue;
            }
        };

        let Some((start, end)) = roll_to_future(start, end, today) else {
            warn!(
                "Vacation '{}' cannot be shifted to a future year. Skipping.",
                item.description
            );
            report.skipped += 1;
            continue;
        };

        if !is_valid(item.description, start, end, item.price) {
            report.skipped += 1;
            continue;
        }

        let record = NewVacation {
            country_id: item.country_id,
            destination: item.destination.to_string(),
            description: item.description.to_string(),
            start_date: start,
            end_date: end,
            price: item.price,
            image_filename: item.image_filename.to_string(),
        };

        let outcome = match VacationService::find_by_description(item.description, pool).await {
            Ok(Some(existing)) => VacationService::update_vacation(existing.vacation_id, record, pool)
                .await
                .map(|_| "Updated"),
            Ok(None) => VacationService::add_vacation(record, pool).await.map(|_| "Inserted"),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(action) => {
                info!("{}: {}", action, item.description);
                report.inserted += 1;
            }
            Err(e) => {
                error!("Failed to store vacation '{}': {}", item.description, e);
                report.skipped += 1;
            }
        }
    }

    info!(
        "Seed completed. Inserted or updated: {}, skipped: {}",
        report.inserted, report.skipped
    );
    Ok(report)
}
