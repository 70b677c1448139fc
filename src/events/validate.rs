use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use time::{
    format_description::FormatItem, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime, Time,
};

use super::dto::CreateEventRequest;
use crate::error::FieldError;

pub(crate) static DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

lazy_static! {
    // Hour 1-12, minutes 00-59, optional space, case-insensitive meridiem.
    static ref TIME_RE: Regex = Regex::new(r"^(0?[1-9]|1[0-2]):([0-5][0-9]) ?([AaPp][Mm])$").unwrap();
}

pub fn parse_event_date(date: &str) -> Option<Date> {
    Date::parse(date.trim(), DATE_FORMAT).ok()
}

/// Parse `H:MM AM/PM` into a 24-hour (hour, minute) pair.
/// 12 AM maps to 0, 12 PM stays 12, any other PM hour gains 12.
pub fn parse_time_12h(time: &str) -> Option<(u8, u8)> {
    let caps = TIME_RE.captures(time.trim())?;
    let hour: u8 = caps[1].parse().ok()?;
    let minute: u8 = caps[2].parse().ok()?;
    let is_pm = caps[3].to_ascii_uppercase() == "PM";
    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    Some((hour, minute))
}

/// Combine a calendar date and a 12-hour time into a UTC instant.
pub fn event_instant(date: &str, time: &str) -> Option<OffsetDateTime> {
    let date = parse_event_date(date)?;
    let (hour, minute) = parse_time_12h(time)?;
    let time = Time::from_hms(hour, minute, 0).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc())
}

pub fn validate_create_event(req: &CreateEventRequest, now: OffsetDateTime) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let name = req.name.trim();
    if name.is_empty() {
        errors.push(FieldError::new("name", "Event name is required"));
    } else if name.len() < 3 || name.len() > 100 {
        errors.push(FieldError::new(
            "name",
            "Event name must be between 3 and 100 characters",
        ));
    }

    if req.date.trim().is_empty() {
        errors.push(FieldError::new("date", "Event date is required"));
    } else if parse_event_date(&req.date).is_none() {
        errors.push(FieldError::new(
            "date",
            "Event date must be a valid date (YYYY-MM-DD)",
        ));
    }

    if req.time.trim().is_empty() {
        errors.push(FieldError::new("time", "Event time is required"));
    } else if parse_time_12h(&req.time).is_none() {
        errors.push(FieldError::new(
            "time",
            "Event time must match the H:MM AM/PM format",
        ));
    }

    if let Some(instant) = event_instant(&req.date, &req.time) {
        if instant <= now {
            errors.push(FieldError::new("date", "Event date must be in the future"));
        }
    }

    let address = req
        .location
        .as_ref()
        .map(|l| l.address.trim())
        .unwrap_or("");
    if address.is_empty() {
        errors.push(FieldError::new("location.address", "Event address is required"));
    } else if address.len() < 3 || address.len() > 200 {
        errors.push(FieldError::new(
            "location.address",
            "Event address must be between 3 and 200 characters",
        ));
    }

    if let Some(description) = &req.description {
        let description = description.trim();
        if description.len() < 10 || description.len() > 500 {
            errors.push(FieldError::new(
                "description",
                "Description must be between 10 and 500 characters",
            ));
        }
    }

    if let Some(max_attendees) = req.max_attendees {
        if max_attendees <= 0 {
            errors.push(FieldError::new(
                "maxAttendees",
                "Max attendees must be a positive number",
            ));
        }
    }

    errors
}

const UPDATABLE_FIELDS: &[&str] = &[
    "name",
    "date",
    "time",
    "location",
    "description",
    "maxAttendees",
];

/// Patch validation for updates: only known fields, at least one of
/// them, and the same per-field rules as creation for whatever is
/// present. The in-the-future rule is re-checked by the handler once
/// patch and stored values are combined.
pub fn validate_update_event(patch: &Map<String, Value>) -> Vec<FieldError> {
    if patch.is_empty() {
        return vec![FieldError::new(
            "patch",
            "At least one field is required to update an event",
        )];
    }

    let unknown: Vec<&str> = patch
        .keys()
        .map(|k| k.as_str())
        .filter(|k| !UPDATABLE_FIELDS.contains(k))
        .collect();
    if !unknown.is_empty() {
        return vec![FieldError::new(
            "patch",
            format!("Invalid fields: {}", unknown.join(", ")),
        )];
    }

    let mut errors = Vec::new();

    if let Some(value) = patch.get("name") {
        match value.as_str().map(str::trim) {
            Some(name) if (3..=100).contains(&name.len()) => {}
            _ => errors.push(FieldError::new(
                "name",
                "Event name must be between 3 and 100 characters",
            )),
        }
    }

    if let Some(value) = patch.get("date") {
        match value.as_str() {
            Some(date) if parse_event_date(date).is_some() => {}
            _ => errors.push(FieldError::new(
                "date",
                "Event date must be a valid date (YYYY-MM-DD)",
            )),
        }
    }

    if let Some(value) = patch.get("time") {
        match value.as_str() {
            Some(time) if parse_time_12h(time).is_some() => {}
            _ => errors.push(FieldError::new(
                "time",
                "Event time must match the H:MM AM/PM format",
            )),
        }
    }

    if let Some(value) = patch.get("location") {
        match value.get("address").and_then(Value::as_str).map(str::trim) {
            Some(address) if (3..=200).contains(&address.len()) => {}
            _ => errors.push(FieldError::new(
                "location.address",
                "Event address must be between 3 and 200 characters",
            )),
        }
    }

    if let Some(value) = patch.get("description") {
        match value.as_str().map(str::trim) {
            Some(description) if (10..=500).contains(&description.len()) => {}
            _ => errors.push(FieldError::new(
                "description",
                "Description must be between 10 and 500 characters",
            )),
        }
    }

    if let Some(value) = patch.get("maxAttendees") {
        match value.as_i64() {
            Some(n) if n > 0 => {}
            _ => errors.push(FieldError::new(
                "maxAttendees",
                "Max attendees must be a positive number",
            )),
        }
    }

    errors
}
