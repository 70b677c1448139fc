use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::dto::{CreateEventRequest, EventResponse};
use super::model::{Event, Location};
use super::validate;
use crate::auth::AuthUser;
use crate::error::{ApiError, FieldError};
use crate::id;
use crate::state::AppState;
use crate::store::StoreError;
use crate::users::dto::MessageResponse;

#[instrument(skip(state, auth, payload))]
pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), ApiError> {
    let now = OffsetDateTime::now_utc();
    let errors = validate::validate_create_event(&payload, now);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let starts_at = validate::event_instant(&payload.date, &payload.time)
        .ok_or_else(|| ApiError::bad_request("Invalid event date or time"))?;
    let location = payload
        .location
        .ok_or_else(|| ApiError::bad_request("Event address is required"))?;

    let event = Event {
        id: id::new_object_id(),
        name: payload.name.trim().to_string(),
        starts_at,
        time: payload.time.trim().to_string(),
        location: Location {
            address: location.address.trim().to_string(),
            latitude: location.latitude,
            longitude: location.longitude,
        },
        description: payload.description.map(|d| d.trim().to_string()),
        max_attendees: payload.max_attendees.map(|n| n as i32),
        organizer_id: auth.user_id,
        created_at: now,
        updated_at: now,
    };

    let event = match state.events.insert(event).await {
        Ok(e) => e,
        Err(StoreError::Duplicate) => {
            warn!("duplicate event creation attempt");
            return Err(ApiError::bad_request(
                "An event with the same name and date already exists",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    info!(event_id = %event.id, organizer = %event.organizer_id, "event created");
    Ok((
        StatusCode::CREATED,
        Json(EventResponse {
            message: "Event created successfully".into(),
            event,
        }),
    ))
}

#[instrument(skip(state, _auth))]
pub async fn list_events(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = state.events.list_upcoming(OffsetDateTime::now_utc()).await?;
    if events.is_empty() {
        return Err(ApiError::not_found("No upcoming events found"));
    }
    Ok(Json(events))
}

#[instrument(skip(state, _auth))]
pub async fn get_event(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(event_id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    if !id::is_object_id(&event_id) {
        return Err(ApiError::bad_request("Invalid event id"));
    }
    let event = state
        .events
        .find_by_id(&event_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))?;
    Ok(Json(event))
}

#[instrument(skip(state, auth, patch))]
pub async fn update_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<String>,
    Json(patch): Json<Map<String, Value>>,
) -> Result<Json<EventResponse>, ApiError> {
    if !id::is_object_id(&event_id) {
        return Err(ApiError::bad_request("Invalid event id"));
    }
    let errors = validate::validate_update_event(&patch);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let mut event = state
        .events
        .find_by_id(&event_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))?;
    // Only the organizer may edit; everyone else sees the same 404 as a
    // missing event.
    if event.organizer_id != auth.user_id {
        return Err(ApiError::not_found("Event not found"));
    }

    if let Some(name) = patch.get("name").and_then(Value::as_str) {
        event.name = name.trim().to_string();
    }
    if let Some(description) = patch.get("description").and_then(Value::as_str) {
        event.description = Some(description.trim().to_string());
    }
    if let Some(max_attendees) = patch.get("maxAttendees").and_then(Value::as_i64) {
        event.max_attendees = Some(max_attendees as i32);
    }
    if let Some(location) = patch.get("location") {
        if let Some(address) = location.get("address").and_then(Value::as_str) {
            event.location.address = address.trim().to_string();
        }
        if let Some(latitude) = location.get("latitude").and_then(Value::as_f64) {
            event.location.latitude = Some(latitude);
        }
        if let Some(longitude) = location.get("longitude").and_then(Value::as_f64) {
            event.location.longitude = Some(longitude);
        }
    }

    let date_patch = patch.get("date").and_then(Value::as_str);
    let time_patch = patch.get("time").and_then(Value::as_str);
    if date_patch.is_some() || time_patch.is_some() {
        // Combine whichever half changed with the stored other half and
        // re-apply the in-the-future rule.
        let date = match date_patch {
            Some(date) => date.trim().to_string(),
            None => event
                .starts_at
                .date()
                .format(validate::DATE_FORMAT)
                .map_err(|e| ApiError::Internal(e.into()))?,
        };
        let time = time_patch
            .map(|t| t.trim().to_string())
            .unwrap_or_else(|| event.time.clone());
        let starts_at = validate::event_instant(&date, &time)
            .ok_or_else(|| ApiError::bad_request("Invalid event date or time"))?;
        if starts_at <= OffsetDateTime::now_utc() {
            return Err(ApiError::Validation(vec![FieldError::new(
                "date",
                "Event date must be in the future",
            )]));
        }
        event.starts_at = starts_at;
        event.time = time;
    }

    event.updated_at = OffsetDateTime::now_utc();
    state.events.update(&event).await?;

    info!(event_id = %event.id, "event updated");
    Ok(Json(EventResponse {
        message: "Event updated successfully".into(),
        event,
    }))
}

#[instrument(skip(state, auth))]
pub async fn delete_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !id::is_object_id(&event_id) {
        return Err(ApiError::bad_request("Invalid event id"));
    }
    let deleted = state.events.delete_owned(&event_id, &auth.user_id).await?;
    if !deleted {
        return Err(ApiError::not_found("Event not found"));
    }
    info!(event_id = %event_id, "event deleted");
    Ok(Json(MessageResponse {
        message: "Event deleted successfully".into(),
    }))
}
