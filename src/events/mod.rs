use axum::{routing::get, Router};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod model;
pub mod validate;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/event",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route(
            "/event/:event_id",
            get(handlers::get_event)
                .put(handlers::update_event)
                .delete(handlers::delete_event),
        )
}
