//! HTTP surface: JSON over axum, one handler module per resource.

mod bookings;
pub mod dto;
pub mod error;
mod slots;
mod venues;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use crate::observability::{REQUEST_DURATION_SECONDS, REQUESTS_TOTAL};

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/venues", post(venues::create).get(venues::list))
        .route("/venues/available", get(venues::available))
        .route("/venues/{id}", get(venues::get_one).delete(venues::delete))
        .route("/venues/{venue_id}/slots", post(slots::create).get(slots::list))
        .route("/slots/{id}", get(slots::get_one))
        .route("/bookings", post(bookings::create).get(bookings::list))
        .route("/bookings/{id}", get(bookings::get_one))
        .route("/bookings/{id}/cancel", put(bookings::cancel))
        .route("/sports", get(venues::sports))
        .route_layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { engine })
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = req.method().to_string();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(REQUESTS_TOTAL, "method" => method.clone(), "route" => route.clone(), "status" => status)
        .increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "method" => method, "route" => route)
        .record(started.elapsed().as_secs_f64());
    response
}
