//! End-to-end tests of the HTTP surface, driven in-process through the router.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use slotbook::api;
use slotbook::engine::Engine;

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("slotbook_test_http");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn app(name: &str) -> Router {
    let engine = Engine::new(test_wal_path(name), Duration::from_secs(5)).unwrap();
    api::router(Arc::new(engine))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn create_venue(app: &Router, name: &str, sport: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/venues",
        Some(json!({"name": name, "location": "Riverside", "sportId": sport})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn create_slot(app: &Router, venue_id: &str, start: &str, end: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/venues/{venue_id}/slots"),
        Some(json!({"startTime": start, "endTime": end})),
    )
    .await
}

async fn reserve(app: &Router, slot_id: &str, user: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/bookings",
        Some(json!({"slotId": slot_id, "userName": user})),
    )
    .await
}

#[tokio::test]
async fn reserve_cancel_rebook_over_http() {
    let app = app("booking_flow.wal");
    let venue_id = create_venue(&app, "Court A", "tennis").await;

    let (status, slot) = create_slot(&app, &venue_id, "2026-03-01 10:00:00", "2026-03-01 11:00:00").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(slot["status"], "AVAILABLE");
    assert_eq!(slot["startTime"], "2026-03-01 10:00:00");
    assert_eq!(slot["venueName"], "Court A");
    let slot_id = slot["id"].as_str().unwrap().to_string();

    let (status, b1) = reserve(&app, &slot_id, "alice").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(b1["status"], "CONFIRMED");
    assert_eq!(b1["userName"], "alice");
    assert_eq!(b1["venueName"], "Court A");
    assert_eq!(b1["slotStartTime"], "2026-03-01 10:00:00");
    assert_eq!(b1["slotEndTime"], "2026-03-01 11:00:00");
    assert!(b1["cancelledAt"].is_null());
    let b1_id = b1["id"].as_str().unwrap().to_string();

    let (status, slot) = send(&app, Method::GET, &format!("/slots/{slot_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(slot["status"], "BOOKED");

    let (status, err) = reserve(&app, &slot_id, "bob").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["status"], 409);
    assert_eq!(err["error"], "Conflict");
    assert!(err["message"].as_str().unwrap().contains("already booked"));
    assert!(err["timestamp"].is_string());

    let (status, body) = send(&app, Method::PUT, &format!("/bookings/{b1_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, cancelled) = send(&app, Method::GET, &format!("/bookings/{b1_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");
    assert!(cancelled["cancelledAt"].is_string());

    let (status, _) = send(&app, Method::PUT, &format!("/bookings/{b1_id}/cancel"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, b2) = reserve(&app, &slot_id, "bob").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(b2["userName"], "bob");

    let (status, all) = send(&app, Method::GET, "/bookings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn overlapping_slot_is_a_conflict() {
    let app = app("overlap.wal");
    let venue_id = create_venue(&app, "Court A", "tennis").await;

    let (status, _) = create_slot(&app, &venue_id, "2026-03-01 09:00:00", "2026-03-01 10:00:00").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, err) = create_slot(&app, &venue_id, "2026-03-01 09:30:00", "2026-03-01 10:30:00").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(err["message"].as_str().unwrap().contains("overlaps"));
    let (status, _) = create_slot(&app, &venue_id, "2026-03-01 10:00:00", "2026-03-01 11:00:00").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, slots) = send(&app, Method::GET, &format!("/venues/{venue_id}/slots"), None).await;
    assert_eq!(status, StatusCode::OK);
    let starts: Vec<&str> = slots
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["startTime"].as_str().unwrap())
        .collect();
    assert_eq!(starts, vec!["2026-03-01 09:00:00", "2026-03-01 10:00:00"]);
}

#[tokio::test]
async fn bad_input_is_a_bad_request() {
    let app = app("bad_input.wal");
    let venue_id = create_venue(&app, "Court A", "tennis").await;

    // Inverted range
    let (status, err) = create_slot(&app, &venue_id, "2026-03-01 11:00:00", "2026-03-01 10:00:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["status"], 400);

    // Wrong time format
    let (status, _) = create_slot(&app, &venue_id, "2026-03-01T10:00:00Z", "2026-03-01 11:00:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing endTime
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/venues/{venue_id}/slots"),
        Some(json!({"startTime": "2026-03-01 10:00:00"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing venue name
    let (status, err) = send(
        &app,
        Method::POST,
        "/venues",
        Some(json!({"location": "Riverside", "sportId": "tennis"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["message"].as_str().unwrap().contains("name is required"));

    let (_, slot) = create_slot(&app, &venue_id, "2026-03-01 10:00:00", "2026-03-01 11:00:00").await;
    let slot_id = slot["id"].as_str().unwrap();
    let (status, err) = send(&app, Method::POST, "/bookings", Some(json!({"slotId": slot_id}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["message"].as_str().unwrap().contains("userName is required"));

    // Malformed JSON body
    let request = Request::builder()
        .method(Method::POST)
        .uri("/bookings")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unparseable id in the path gets the same error body as every other 400
    let (status, err) = send(&app, Method::GET, "/slots/not-a-ulid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["status"], 400);
    assert_eq!(err["error"], "Bad Request");
    assert!(err["message"].is_string());
    assert!(err["timestamp"].is_string());
    let (status, err) = send(&app, Method::PUT, "/bookings/xyz/cancel", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["status"], 400);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = app("not_found.wal");
    let missing = ulid::Ulid::new();

    let (status, err) = send(&app, Method::GET, &format!("/venues/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"], "Not Found");

    let (status, _) = send(&app, Method::GET, &format!("/slots/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, &format!("/bookings/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::PUT, &format!("/bookings/{missing}/cancel"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = reserve(&app, &missing.to_string(), "alice").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = create_slot(&app, &missing.to_string(), "2026-03-01 10:00:00", "2026-03-01 11:00:00").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn available_venues_by_sport_and_window() {
    let app = app("available.wal");
    let court = create_venue(&app, "Court A", "tennis").await;
    let pitch = create_venue(&app, "Pitch", "football").await;

    let (_, inside) = create_slot(&app, &court, "2026-03-01 10:00:00", "2026-03-01 11:00:00").await;
    let (_, straddling) = create_slot(&app, &court, "2026-03-01 08:30:00", "2026-03-01 09:30:00").await;
    let (_, booked) = create_slot(&app, &court, "2026-03-01 12:00:00", "2026-03-01 13:00:00").await;
    create_slot(&app, &pitch, "2026-03-01 10:00:00", "2026-03-01 11:00:00").await;
    let (status, _) = reserve(&app, booked["id"].as_str().unwrap(), "alice").await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = "/venues/available?sportId=tennis&startTime=2026-03-01%2009:00:00&endTime=2026-03-01%2017:00:00";
    let (status, rows) = send(&app, Method::GET, uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["slotId"], inside["id"]);
    assert_eq!(rows[0]["venueId"], court.as_str());
    assert_eq!(rows[0]["venueName"], "Court A");
    assert_eq!(rows[0]["location"], "Riverside");
    assert_eq!(rows[0]["sportId"], "tennis");
    assert_eq!(rows[0]["slotStartTime"], "2026-03-01 10:00:00");
    assert_ne!(rows[0]["slotId"], straddling["id"]);

    // No sport filter covers both venues
    let uri = "/venues/available?startTime=2026-03-01%2009:00:00&endTime=2026-03-01%2017:00:00";
    let (_, rows) = send(&app, Method::GET, uri, None).await;
    assert_eq!(rows.as_array().unwrap().len(), 2);

    let uri = "/venues/available?startTime=2026-03-01%2017:00:00&endTime=2026-03-01%2009:00:00";
    let (status, _) = send(&app, Method::GET, uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/venues/available?sportId=tennis", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn venue_listing_and_deletion() {
    let app = app("venues.wal");
    let court = create_venue(&app, "Court A", "tennis").await;
    let pitch = create_venue(&app, "Pitch", "football").await;
    create_slot(&app, &court, "2026-03-01 10:00:00", "2026-03-01 11:00:00").await;

    let (status, venues) = send(&app, Method::GET, "/venues?sportId=football", None).await;
    assert_eq!(status, StatusCode::OK);
    let venues = venues.as_array().unwrap();
    assert_eq!(venues.len(), 1);
    assert_eq!(venues[0]["id"], pitch.as_str());
    assert_eq!(venues[0]["sportId"], "football");

    let (_, venues) = send(&app, Method::GET, "/venues", None).await;
    assert_eq!(venues.as_array().unwrap().len(), 2);

    let (status, _) = send(&app, Method::DELETE, &format!("/venues/{court}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, Method::DELETE, &format!("/venues/{pitch}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &format!("/venues/{pitch}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sports_start_empty() {
    let app = app("sports.wal");
    let (status, sports) = send(&app, Method::GET, "/sports", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sports, json!([]));
}
