//! Appointment endpoints. All act on the caller's own registry.
//!
//! - `POST /api/appointments` — book (explicit slot or booking form)
//! - `GET /api/appointments` — calendar range, or status tab + search
//! - `GET /api/appointments/summary` — dashboard counters
//! - `GET /api/appointments/:id` — one appointment
//! - `GET /api/appointments/:id/conflicts` — overlapping active appointments
//! - `PATCH /api/appointments/:id/status` — lifecycle transition
//! - `PATCH /api/appointments/:id/schedule` — reschedule

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::SessionContext;
use crate::appointment::{AppointmentSummary, BookingForm, NewAppointment};
use crate::core_state::lock_session;
use crate::models::{Appointment, AppointmentFilter, AppointmentStatus};

/// Booking body. The form variant is tried first: it requires `date` and
/// `time`, which a slot body never carries.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateAppointmentBody {
    Form(BookingForm),
    Slot(NewAppointment),
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub filter: Option<AppointmentFilter>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: AppointmentStatus,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleBody {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct AppointmentResponse {
    pub appointment: Appointment,
}

#[derive(Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<Appointment>,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub summary: AppointmentSummary,
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid appointment ID".into()))
}

/// `POST /api/appointments` — book on behalf of the caller.
pub async fn create(
    Extension(caller): Extension<SessionContext>,
    body: Result<Json<CreateAppointmentBody>, JsonRejection>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    let Json(body) = body?;
    let mut session = lock_session(&caller.session)?;
    let role = session.role();

    let request = match body {
        CreateAppointmentBody::Form(form) => form.into_request(role)?,
        CreateAppointmentBody::Slot(slot) => slot.into_request(role),
    };
    let appointment = session.registry_mut().create(request)?;

    Ok((StatusCode::CREATED, Json(AppointmentResponse { appointment })))
}

/// `GET /api/appointments` — with `start` and `end`, the calendar window;
/// otherwise the list view filtered by `filter` and `search`.
pub async fn list(
    Extension(caller): Extension<SessionContext>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let Query(query) = query?;
    let session = lock_session(&caller.session)?;
    let registry = session.registry();

    let appointments = match (query.start, query.end) {
        (Some(start), Some(end)) => {
            if start >= end {
                return Err(ApiError::BadRequest("start must be before end".into()));
            }
            registry.list_for_range(start, end)
        }
        (None, None) => registry.filter(query.filter.unwrap_or_default(), query.search.as_deref()),
        _ => {
            return Err(ApiError::BadRequest(
                "start and end must be given together".into(),
            ))
        }
    };

    Ok(Json(AppointmentsResponse { appointments }))
}

/// `GET /api/appointments/summary` — dashboard counters as of now.
pub async fn summary(
    Extension(caller): Extension<SessionContext>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let session = lock_session(&caller.session)?;
    let summary = session.registry().summary(Utc::now());
    Ok(Json(SummaryResponse { summary }))
}

/// `GET /api/appointments/:id`
pub async fn detail(
    Extension(caller): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let id = parse_id(&id)?;
    let session = lock_session(&caller.session)?;
    let appointment = session.registry().get(id)?;
    Ok(Json(AppointmentResponse { appointment }))
}

/// `GET /api/appointments/:id/conflicts`
pub async fn conflicts(
    Extension(caller): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let id = parse_id(&id)?;
    let session = lock_session(&caller.session)?;
    let appointments = session.registry().conflicts_for(id)?;
    Ok(Json(AppointmentsResponse { appointments }))
}

/// `PATCH /api/appointments/:id/status`
pub async fn update_status(
    Extension(caller): Extension<SessionContext>,
    Path(id): Path<String>,
    body: Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let mut session = lock_session(&caller.session)?;
    let appointment = session.registry_mut().transition(id, body.status)?;
    Ok(Json(AppointmentResponse { appointment }))
}

/// `PATCH /api/appointments/:id/schedule`
pub async fn reschedule(
    Extension(caller): Extension<SessionContext>,
    Path(id): Path<String>,
    body: Result<Json<ScheduleBody>, JsonRejection>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let mut session = lock_session(&caller.session)?;
    let appointment = session
        .registry_mut()
        .reschedule(id, body.start_at, body.end_at)?;
    Ok(Json(AppointmentResponse { appointment }))
}
