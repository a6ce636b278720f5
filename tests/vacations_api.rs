mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use vacanza::handlers;

fn vacation_payload(country_id: i64, description: &str, price: f64) -> Value {
    json!({
        "country_id": country_id,
        "destination": "Venice",
        "description": description,
        "start_date": "2026-08-01",
        "end_date": "2026-08-10",
        "price": price,
        "image_filename": "venice.webp"
    })
}

#[actix_web::test]
async fn vacations_crud_flow() {
    let ctx = common::setup();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.pool.clone()))
            .app_data(web::Data::new(ctx.config.clone()))
            .configure(handlers::configure(ctx.config.images_dir.clone())),
    )
    .await;

    let (_, token) = common::create_test_user(&ctx, "editor@example.com").await;
    let bearer = format!("Bearer {}", token);

    let req = test::TestRequest::post()
        .uri("/countries")
        .set_json(json!({ "country_name": "Italy" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let country: Value = test::read_body_json(resp).await;
    let country_id = country["country_id"].as_i64().unwrap();

    // Create
    let req = test::TestRequest::post()
        .uri("/vacations")
        .insert_header(("Authorization", bearer.clone()))
        .set_json(vacation_payload(country_id, "Relaxation in Italy", 1600.0))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let vacation_id = body["vacation_id"].as_i64().unwrap();
    assert!(vacation_id > 0);

    // The listing joins in the country name
    let resp = test::call_service(&app, test::TestRequest::get().uri("/vacations").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let listed: Value = test::read_body_json(resp).await;
    let rows = listed.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["description"], "Relaxation in Italy");
    assert_eq!(rows[0]["country_name"], "Italy");
    assert_eq!(rows[0]["start_date"], "2026-08-01");
    assert_eq!(rows[0]["price"], 1600.0);

    // Update
    let uri = format!("/vacations/{}", vacation_id);
    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(("Authorization", bearer.clone()))
        .set_json(vacation_payload(country_id, "Relaxation in Italy", 1750.0))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/vacations").to_request()).await;
    let listed: Value = test::read_body_json(resp).await;
    assert_eq!(listed[0]["price"], 1750.0);

    // Updating an id that does not exist is a 404
    let req = test::TestRequest::put()
        .uri("/vacations/9999")
        .insert_header(("Authorization", bearer.clone()))
        .set_json(vacation_payload(country_id, "Ghost trip", 100.0))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Delete, then delete again
    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(("Authorization", bearer.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(("Authorization", bearer))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Vacation not found");

    let resp = test::call_service(&app, test::TestRequest::get().uri("/vacations").to_request()).await;
    let listed: Value = test::read_body_json(resp).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn vacation_mutations_require_a_valid_token() {
    let ctx = common::setup();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.pool.clone()))
            .app_data(web::Data::new(ctx.config.clone()))
            .configure(handlers::configure(ctx.config.images_dir.clone())),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/countries")
        .set_json(json!({ "country_name": "Italy" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let country: Value = test::read_body_json(resp).await;
    let country_id = country["country_id"].as_i64().unwrap();

    // No header at all
    let req = test::TestRequest::post()
        .uri("/vacations")
        .set_json(vacation_payload(country_id, "Relaxation in Italy", 1600.0))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Authorization header missing or invalid");

    // Wrong scheme
    let req = test::TestRequest::post()
        .uri("/vacations")
        .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
        .set_json(vacation_payload(country_id, "Relaxation in Italy", 1600.0))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Bearer prefix with a token that does not decode
    let req = test::TestRequest::post()
        .uri("/vacations")
        .insert_header(("Authorization", "Bearer not-a-real-token"))
        .set_json(vacation_payload(country_id, "Relaxation in Italy", 1600.0))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid or expired token");

    // None of the rejected requests wrote anything
    let resp = test::call_service(&app, test::TestRequest::get().uri("/vacations").to_request()).await;
    let listed: Value = test::read_body_json(resp).await;
    assert_eq!(listed, json!([]));
}

#[actix_web::test]
async fn vacation_payload_validation() {
    let ctx = common::setup();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.pool.clone()))
            .app_data(web::Data::new(ctx.config.clone()))
            .configure(handlers::configure(ctx.config.images_dir.clone())),
    )
    .await;

    let (_, token) = common::create_test_user(&ctx, "editor@example.com").await;
    let bearer = format!("Bearer {}", token);

    let req = test::TestRequest::post()
        .uri("/countries")
        .set_json(json!({ "country_name": "Italy" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let country: Value = test::read_body_json(resp).await;
    let country_id = country["country_id"].as_i64().unwrap();

    // Just over the price cap
    let req = test::TestRequest::post()
        .uri("/vacations")
        .insert_header(("Authorization", bearer.clone()))
        .set_json(vacation_payload(country_id, "Too expensive", 10_000.01))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Price must be between 0 and 10000");

    // End before start
    let mut reversed = vacation_payload(country_id, "Backwards", 100.0);
    reversed["start_date"] = json!("2026-08-10");
    reversed["end_date"] = json!("2026-08-01");
    let req = test::TestRequest::post()
        .uri("/vacations")
        .insert_header(("Authorization", bearer.clone()))
        .set_json(reversed)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Blank description
    let req = test::TestRequest::post()
        .uri("/vacations")
        .insert_header(("Authorization", bearer.clone()))
        .set_json(vacation_payload(country_id, "   ", 100.0))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Unknown country id is caught by the foreign key
    let req = test::TestRequest::post()
        .uri("/vacations")
        .insert_header(("Authorization", bearer.clone()))
        .set_json(vacation_payload(999, "Nowhere", 100.0))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "country_id does not match an existing country");

    // Nothing slipped through
    let resp = test::call_service(&app, test::TestRequest::get().uri("/vacations").to_request()).await;
    let listed: Value = test::read_body_json(resp).await;
    assert_eq!(listed, json!([]));
}
