//! Appointment lifecycle: booking, status transitions, rescheduling and
//! calendar queries for a single actor.
//!
//! One `AppointmentRegistry` per signed-in actor. Appointments are never
//! removed; cancellation is a status. Reads hand out clones so the
//! presentation layer cannot mutate entries behind the registry's back.
//!
//! Lifecycle:
//! ```text
//! pending ──► confirmed ──► completed
//!    │  ▲         │
//!    │  └─────────┤ (reschedule)
//!    ▼            ▼
//! cancelled ◄─────┘
//! ```

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, Modality, Role};

const MAX_SUBJECT_LEN: usize = 200;
const MAX_FREE_TEXT_LEN: usize = 2000;
/// Longest slot the booking form accepts (12 hours).
const MAX_DURATION_MINUTES: u32 = 720;

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppointmentError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}

// ─── Types ────────────────────────────────────────────────────────────────────

/// Validated input for `AppointmentRegistry::create`.
///
/// Times are optional so a half-filled form can be passed through and
/// rejected with a precise message instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRequest {
    pub initiated_by: Role,
    pub subject_name: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub modality: Modality,
    pub notes: Option<String>,
    pub specialty: Option<String>,
    pub location: Option<String>,
}

/// Appointment fields as sent by a client, before the initiator is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    #[serde(default)]
    pub subject_name: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modality: Modality,
    pub notes: Option<String>,
    pub specialty: Option<String>,
    pub location: Option<String>,
}

impl NewAppointment {
    pub fn into_request(self, initiated_by: Role) -> AppointmentRequest {
        AppointmentRequest {
            initiated_by,
            subject_name: self.subject_name,
            start_at: self.start_at,
            end_at: self.end_at,
            modality: self.modality,
            notes: self.notes,
            specialty: self.specialty,
            location: self.location,
        }
    }
}

/// The booking modal: a calendar date, a wall-clock start and a duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingForm {
    pub subject_name: String,
    pub date: String, // YYYY-MM-DD
    pub time: String, // HH:MM
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub modality: Modality,
    pub notes: Option<String>,
    pub specialty: Option<String>,
    pub location: Option<String>,
}

impl BookingForm {
    /// Resolve the form into an absolute UTC slot.
    pub fn into_request(self, initiated_by: Role) -> Result<AppointmentRequest, AppointmentError> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").map_err(|_| {
            AppointmentError::InvalidRequest("Invalid date format. Use YYYY-MM-DD".into())
        })?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H:%M").map_err(|_| {
            AppointmentError::InvalidRequest("Invalid time format. Use HH:MM".into())
        })?;

        let minutes = self
            .duration_minutes
            .unwrap_or(config::DEFAULT_APPOINTMENT_MINUTES);
        if minutes == 0 || minutes > MAX_DURATION_MINUTES {
            return Err(AppointmentError::InvalidRequest(format!(
                "Duration must be between 1 and {MAX_DURATION_MINUTES} minutes"
            )));
        }

        let start_at = date.and_time(time).and_utc();
        let end_at = start_at
            .checked_add_signed(Duration::minutes(i64::from(minutes)))
            .ok_or_else(|| invalid("Appointment time out of range"))?;

        Ok(AppointmentRequest {
            initiated_by,
            subject_name: self.subject_name,
            start_at: Some(start_at),
            end_at: Some(end_at),
            modality: self.modality,
            notes: self.notes,
            specialty: self.specialty,
            location: self.location,
        })
    }
}

/// Dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSummary {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
    /// Active appointments starting at or after the reference time.
    pub upcoming: usize,
    pub next: Option<Appointment>,
}

// ─── Registry ─────────────────────────────────────────────────────────────────

/// Owning collection of one actor's appointments.
#[derive(Debug, Default, Clone)]
pub struct AppointmentRegistry {
    appointments: Vec<Appointment>,
}

impl AppointmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    /// Book a new appointment.
    ///
    /// Patients' bookings start `pending`, doctors' start `confirmed`.
    /// Overlap with existing appointments is not checked here; see
    /// `conflicts_for`.
    pub fn create(&mut self, request: AppointmentRequest) -> Result<Appointment, AppointmentError> {
        let subject_name = validate_subject(&request.subject_name)?;
        let (start_at, end_at) = match (request.start_at, request.end_at) {
            (Some(start), Some(end)) => (start, end),
            (None, _) => return Err(invalid("Start time is required")),
            (_, None) => return Err(invalid("End time is required")),
        };
        validate_slot(start_at, end_at)?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            subject_name,
            start_at,
            end_at,
            modality: request.modality,
            status: request.initiated_by.initial_status(),
            notes: clean_optional("Notes", request.notes)?,
            specialty: clean_optional("Specialty", request.specialty)?,
            location: clean_optional("Location", request.location)?,
            created_by: request.initiated_by,
            created_at: now,
            updated_at: now,
        };

        tracing::info!(
            appointment_id = %appointment.id,
            status = %appointment.status,
            initiated_by = %appointment.created_by,
            "Appointment created"
        );

        self.appointments.push(appointment.clone());
        Ok(appointment)
    }

    /// Move an appointment along the lifecycle graph.
    pub fn transition(
        &mut self,
        id: Uuid,
        next: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.find_mut(id)?;
        let from = appointment.status;

        if !from.can_transition_to(next) {
            tracing::warn!(appointment_id = %id, %from, to = %next, "Rejected status transition");
            return Err(AppointmentError::InvalidTransition { from, to: next });
        }

        appointment.status = next;
        appointment.updated_at = Utc::now();
        tracing::info!(appointment_id = %id, %from, to = %next, "Appointment status changed");

        Ok(appointment.clone())
    }

    /// Replace the slot of a pending or confirmed appointment.
    /// The new slot needs fresh confirmation, so status resets to `pending`.
    pub fn reschedule(
        &mut self,
        id: Uuid,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.find_mut(id)?;

        if appointment.status.is_terminal() {
            tracing::warn!(appointment_id = %id, status = %appointment.status, "Rejected reschedule");
            return Err(AppointmentError::InvalidRequest(format!(
                "Cannot reschedule a {} appointment",
                appointment.status
            )));
        }
        validate_slot(new_start, new_end)?;

        appointment.start_at = new_start;
        appointment.end_at = new_end;
        appointment.status = AppointmentStatus::Pending;
        appointment.updated_at = Utc::now();

        tracing::info!(
            appointment_id = %id,
            start_at = %new_start,
            end_at = %new_end,
            "Appointment rescheduled"
        );

        Ok(appointment.clone())
    }

    pub fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(AppointmentError::NotFound(id))
    }

    /// All appointments, earliest first.
    pub fn list(&self) -> Vec<Appointment> {
        sorted(self.appointments.iter())
    }

    /// Appointments intersecting `[start, end)`, earliest first.
    /// An empty or inverted window yields nothing.
    pub fn list_for_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Appointment> {
        if start >= end {
            return Vec::new();
        }
        sorted(self.appointments.iter().filter(|a| a.overlaps(start, end)))
    }

    /// Status tab plus the free-text search box of the appointments page.
    /// Search matches subject name or specialty, case-insensitively.
    pub fn filter(&self, filter: AppointmentFilter, search: Option<&str>) -> Vec<Appointment> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        sorted(self.appointments.iter().filter(|a| {
            filter.matches(a.status)
                && needle.as_deref().map_or(true, |n| {
                    a.subject_name.to_lowercase().contains(n)
                        || a
                            .specialty
                            .as_deref()
                            .is_some_and(|s| s.to_lowercase().contains(n))
                })
        }))
    }

    /// Active appointments overlapping `[start, end)`.
    pub fn overlapping(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Appointment> {
        sorted(
            self.appointments
                .iter()
                .filter(|a| a.status.is_active() && a.overlaps(start, end)),
        )
    }

    /// Other active appointments that clash with the given one.
    pub fn conflicts_for(&self, id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let target = self.get(id)?;
        Ok(self
            .overlapping(target.start_at, target.end_at)
            .into_iter()
            .filter(|a| a.id != id)
            .collect())
    }

    pub fn summary(&self, now: DateTime<Utc>) -> AppointmentSummary {
        let mut summary = AppointmentSummary {
            total: self.appointments.len(),
            ..AppointmentSummary::default()
        };

        for appointment in &self.appointments {
            match appointment.status {
                AppointmentStatus::Pending => summary.pending += 1,
                AppointmentStatus::Confirmed => summary.confirmed += 1,
                AppointmentStatus::Completed => summary.completed += 1,
                AppointmentStatus::Cancelled => summary.cancelled += 1,
            }
        }

        let upcoming: Vec<&Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.status.is_active() && a.start_at >= now)
            .collect();
        summary.upcoming = upcoming.len();
        summary.next = upcoming.into_iter().min_by_key(|a| a.start_at).cloned();

        summary
    }

    fn find_mut(&mut self, id: Uuid) -> Result<&mut Appointment, AppointmentError> {
        self.appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AppointmentError::NotFound(id))
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn invalid(message: &str) -> AppointmentError {
    AppointmentError::InvalidRequest(message.to_string())
}

/// Stable sort keeps booking order for identical start times.
fn sorted<'a>(iter: impl Iterator<Item = &'a Appointment>) -> Vec<Appointment> {
    let mut out: Vec<Appointment> = iter.cloned().collect();
    out.sort_by_key(|a| a.start_at);
    out
}

fn validate_subject(name: &str) -> Result<String, AppointmentError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("Subject name is required"));
    }
    if name.chars().count() > MAX_SUBJECT_LEN {
        return Err(invalid("Subject name too long"));
    }
    Ok(name.to_string())
}

fn validate_slot(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppointmentError> {
    if start >= end {
        return Err(AppointmentError::InvalidRequest(format!(
            "Start time {start} must be before end time {end}"
        )));
    }
    Ok(())
}

/// Trim; blank becomes `None`.
fn clean_optional(field: &str, value: Option<String>) -> Result<Option<String>, AppointmentError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.chars().count() > MAX_FREE_TEXT_LEN {
        return Err(AppointmentError::InvalidRequest(format!("{field} too long")));
    }
    Ok(Some(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn request(role: Role, subject: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> AppointmentRequest {
        AppointmentRequest {
            initiated_by: role,
            subject_name: subject.into(),
            start_at: Some(start),
            end_at: Some(end),
            modality: Modality::InPerson,
            notes: None,
            specialty: None,
            location: None,
        }
    }

    fn patient_booking(registry: &mut AppointmentRegistry) -> Appointment {
        registry
            .create(request(
                Role::Patient,
                "Dra. Ana Méndez",
                at(2024, 3, 25, 10, 30),
                at(2024, 3, 25, 11, 0),
            ))
            .unwrap()
    }

    // ── create ──

    #[test]
    fn patient_booking_starts_pending() {
        let mut registry = AppointmentRegistry::new();
        let appt = patient_booking(&mut registry);
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert_eq!(appt.created_by, Role::Patient);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(appt.id).unwrap(), appt);
    }

    #[test]
    fn doctor_booking_starts_confirmed() {
        let mut registry = AppointmentRegistry::new();
        let appt = registry
            .create(request(
                Role::Doctor,
                "María García",
                at(2024, 3, 25, 9, 0),
                at(2024, 3, 25, 10, 0),
            ))
            .unwrap();
        assert_eq!(appt.status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn create_rejects_inverted_slot_and_leaves_set_unchanged() {
        let mut registry = AppointmentRegistry::new();
        patient_booking(&mut registry);

        let err = registry
            .create(request(
                Role::Patient,
                "Dra. Carmen López",
                at(2024, 4, 2, 15, 0),
                at(2024, 4, 2, 14, 0),
            ))
            .unwrap_err();

        assert!(matches!(err, AppointmentError::InvalidRequest(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn create_rejects_zero_length_slot() {
        let mut registry = AppointmentRegistry::new();
        let t = at(2024, 4, 2, 14, 0);
        let err = registry.create(request(Role::Doctor, "Ana López", t, t)).unwrap_err();
        assert!(matches!(err, AppointmentError::InvalidRequest(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn create_requires_subject_and_times() {
        let mut registry = AppointmentRegistry::new();

        let blank = request(Role::Patient, "   ", at(2024, 1, 1, 9, 0), at(2024, 1, 1, 10, 0));
        assert_eq!(
            registry.create(blank).unwrap_err(),
            AppointmentError::InvalidRequest("Subject name is required".into())
        );

        let mut no_start = request(Role::Patient, "Dr. X", at(2024, 1, 1, 9, 0), at(2024, 1, 1, 10, 0));
        no_start.start_at = None;
        assert_eq!(
            registry.create(no_start).unwrap_err(),
            AppointmentError::InvalidRequest("Start time is required".into())
        );

        let mut no_end = request(Role::Patient, "Dr. X", at(2024, 1, 1, 9, 0), at(2024, 1, 1, 10, 0));
        no_end.end_at = None;
        assert_eq!(
            registry.create(no_end).unwrap_err(),
            AppointmentError::InvalidRequest("End time is required".into())
        );

        assert!(registry.is_empty());
    }

    #[test]
    fn create_trims_text_fields() {
        let mut registry = AppointmentRegistry::new();
        let mut req = request(Role::Patient, "  Dra. Ana Méndez ", at(2024, 1, 1, 9, 0), at(2024, 1, 1, 10, 0));
        req.notes = Some("  Control de rutina  ".into());
        req.location = Some("   ".into());

        let appt = registry.create(req).unwrap();
        assert_eq!(appt.subject_name, "Dra. Ana Méndez");
        assert_eq!(appt.notes.as_deref(), Some("Control de rutina"));
        assert_eq!(appt.location, None);
    }

    #[test]
    fn create_rejects_overlong_subject() {
        let mut registry = AppointmentRegistry::new();
        let name = "x".repeat(MAX_SUBJECT_LEN + 1);
        let err = registry
            .create(request(Role::Patient, &name, at(2024, 1, 1, 9, 0), at(2024, 1, 1, 10, 0)))
            .unwrap_err();
        assert!(matches!(err, AppointmentError::InvalidRequest(_)));
    }

    #[test]
    fn create_does_not_reject_overlap() {
        let mut registry = AppointmentRegistry::new();
        patient_booking(&mut registry);
        patient_booking(&mut registry);
        assert_eq!(registry.len(), 2);
    }

    // ── transition ──

    #[test]
    fn full_lifecycle_then_terminal_rejection() {
        let mut registry = AppointmentRegistry::new();
        let appt = patient_booking(&mut registry);

        let confirmed = registry.transition(appt.id, AppointmentStatus::Confirmed).unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

        let completed = registry.transition(appt.id, AppointmentStatus::Completed).unwrap();
        assert_eq!(completed.status, AppointmentStatus::Completed);

        let err = registry
            .transition(appt.id, AppointmentStatus::Cancelled)
            .unwrap_err();
        assert_eq!(
            err,
            AppointmentError::InvalidTransition {
                from: AppointmentStatus::Completed,
                to: AppointmentStatus::Cancelled,
            }
        );
        assert_eq!(registry.get(appt.id).unwrap().status, AppointmentStatus::Completed);
    }

    #[test]
    fn cancelled_is_terminal() {
        let mut registry = AppointmentRegistry::new();
        let appt = patient_booking(&mut registry);
        registry.transition(appt.id, AppointmentStatus::Cancelled).unwrap();

        for next in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ] {
            assert!(matches!(
                registry.transition(appt.id, next),
                Err(AppointmentError::InvalidTransition { .. })
            ));
        }
        // Still present: cancellation is not removal.
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn pending_cannot_complete_directly() {
        let mut registry = AppointmentRegistry::new();
        let appt = patient_booking(&mut registry);
        let err = registry
            .transition(appt.id, AppointmentStatus::Completed)
            .unwrap_err();
        assert_eq!(
            err,
            AppointmentError::InvalidTransition {
                from: AppointmentStatus::Pending,
                to: AppointmentStatus::Completed,
            }
        );
    }

    #[test]
    fn confirmed_can_return_to_pending() {
        let mut registry = AppointmentRegistry::new();
        let appt = patient_booking(&mut registry);
        registry.transition(appt.id, AppointmentStatus::Confirmed).unwrap();

        let back = registry.transition(appt.id, AppointmentStatus::Pending).unwrap();
        assert_eq!(back.status, AppointmentStatus::Pending);
        assert_eq!(back.start_at, appt.start_at);

        // And forward again.
        let again = registry.transition(appt.id, AppointmentStatus::Confirmed).unwrap();
        assert_eq!(again.status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn transition_unknown_id_is_not_found() {
        let mut registry = AppointmentRegistry::new();
        let id = Uuid::new_v4();
        assert_eq!(
            registry.transition(id, AppointmentStatus::Confirmed).unwrap_err(),
            AppointmentError::NotFound(id)
        );
    }

    #[test]
    fn transition_bumps_updated_at() {
        let mut registry = AppointmentRegistry::new();
        let appt = patient_booking(&mut registry);
        let confirmed = registry.transition(appt.id, AppointmentStatus::Confirmed).unwrap();
        assert!(confirmed.updated_at >= appt.updated_at);
        assert_eq!(confirmed.created_at, appt.created_at);
    }

    // ── reschedule ──

    #[test]
    fn reschedule_confirmed_resets_to_pending() {
        let mut registry = AppointmentRegistry::new();
        let appt = patient_booking(&mut registry);
        registry.transition(appt.id, AppointmentStatus::Confirmed).unwrap();

        let moved = registry
            .reschedule(appt.id, at(2024, 3, 26, 9, 0), at(2024, 3, 26, 9, 30))
            .unwrap();

        assert_eq!(moved.status, AppointmentStatus::Pending);
        assert_eq!(moved.start_at, at(2024, 3, 26, 9, 0));
        assert_eq!(moved.end_at, at(2024, 3, 26, 9, 30));
        assert_eq!(moved.id, appt.id);
    }

    #[test]
    fn reschedule_completed_fails() {
        let mut registry = AppointmentRegistry::new();
        let appt = patient_booking(&mut registry);
        registry.transition(appt.id, AppointmentStatus::Confirmed).unwrap();
        registry.transition(appt.id, AppointmentStatus::Completed).unwrap();

        let err = registry
            .reschedule(appt.id, at(2024, 3, 26, 9, 0), at(2024, 3, 26, 9, 30))
            .unwrap_err();
        assert!(matches!(err, AppointmentError::InvalidRequest(_)));

        let stored = registry.get(appt.id).unwrap();
        assert_eq!(stored.start_at, appt.start_at);
        assert_eq!(stored.status, AppointmentStatus::Completed);
    }

    #[test]
    fn reschedule_rejects_inverted_slot_without_mutation() {
        let mut registry = AppointmentRegistry::new();
        let appt = patient_booking(&mut registry);
        registry.transition(appt.id, AppointmentStatus::Confirmed).unwrap();

        let err = registry
            .reschedule(appt.id, at(2024, 3, 26, 10, 0), at(2024, 3, 26, 9, 0))
            .unwrap_err();
        assert!(matches!(err, AppointmentError::InvalidRequest(_)));

        let stored = registry.get(appt.id).unwrap();
        assert_eq!(stored.status, AppointmentStatus::Confirmed);
        assert_eq!(stored.start_at, appt.start_at);
    }

    #[test]
    fn reschedule_unknown_id_is_not_found() {
        let mut registry = AppointmentRegistry::new();
        let id = Uuid::new_v4();
        let err = registry
            .reschedule(id, at(2024, 3, 26, 9, 0), at(2024, 3, 26, 10, 0))
            .unwrap_err();
        assert_eq!(err, AppointmentError::NotFound(id));
    }

    #[test]
    fn reschedule_pending_stays_pending() {
        let mut registry = AppointmentRegistry::new();
        let appt = patient_booking(&mut registry);

        let moved = registry
            .reschedule(appt.id, at(2024, 3, 27, 16, 0), at(2024, 3, 27, 16, 30))
            .unwrap();
        assert_eq!(moved.status, AppointmentStatus::Pending);
        assert_eq!(moved.start_at, at(2024, 3, 27, 16, 0));
    }

    // ── queries ──

    #[test]
    fn list_for_range_is_ordered_and_clipped() {
        let mut registry = AppointmentRegistry::new();
        let late = registry
            .create(request(Role::Doctor, "C", at(2024, 3, 27, 14, 0), at(2024, 3, 27, 15, 0)))
            .unwrap();
        let early = registry
            .create(request(Role::Doctor, "A", at(2024, 3, 25, 8, 0), at(2024, 3, 25, 9, 0)))
            .unwrap();
        let mid = registry
            .create(request(Role::Doctor, "B", at(2024, 3, 26, 10, 0), at(2024, 3, 26, 11, 0)))
            .unwrap();
        registry
            .create(request(Role::Doctor, "Out", at(2024, 4, 10, 10, 0), at(2024, 4, 10, 11, 0)))
            .unwrap();

        let week = registry.list_for_range(at(2024, 3, 25, 0, 0), at(2024, 4, 1, 0, 0));
        let ids: Vec<Uuid> = week.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![early.id, mid.id, late.id]);
        assert!(week.windows(2).all(|w| w[0].start_at <= w[1].start_at));
    }

    #[test]
    fn list_for_range_includes_partial_overlap() {
        let mut registry = AppointmentRegistry::new();
        let appt = registry
            .create(request(Role::Doctor, "Night", at(2024, 3, 24, 23, 30), at(2024, 3, 25, 0, 30)))
            .unwrap();

        let day = registry.list_for_range(at(2024, 3, 25, 0, 0), at(2024, 3, 26, 0, 0));
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].id, appt.id);

        // Ends exactly where the window starts: excluded.
        let after = registry.list_for_range(at(2024, 3, 25, 0, 30), at(2024, 3, 25, 2, 0));
        assert!(after.is_empty());
    }

    #[test]
    fn list_for_range_with_inverted_window_is_empty() {
        let mut registry = AppointmentRegistry::new();
        patient_booking(&mut registry);
        assert!(registry
            .list_for_range(at(2024, 3, 26, 0, 0), at(2024, 3, 25, 0, 0))
            .is_empty());
    }

    #[test]
    fn list_keeps_cancelled_entries() {
        let mut registry = AppointmentRegistry::new();
        let appt = patient_booking(&mut registry);
        registry.transition(appt.id, AppointmentStatus::Cancelled).unwrap();
        assert_eq!(registry.list().len(), 1);
        assert_eq!(
            registry.list_for_range(at(2024, 3, 25, 0, 0), at(2024, 3, 26, 0, 0)).len(),
            1
        );
    }

    #[test]
    fn filter_by_status_and_search() {
        let mut registry = AppointmentRegistry::new();
        let mut gyn = request(Role::Patient, "Dra. Ana Méndez", at(2024, 3, 25, 10, 30), at(2024, 3, 25, 11, 0));
        gyn.specialty = Some("Ginecología".into());
        let gyn = registry.create(gyn).unwrap();

        let mut obs = request(Role::Patient, "Dra. Carmen López", at(2024, 4, 2, 14, 0), at(2024, 4, 2, 15, 0));
        obs.specialty = Some("Obstetricia".into());
        let obs = registry.create(obs).unwrap();
        registry.transition(obs.id, AppointmentStatus::Cancelled).unwrap();

        let upcoming = registry.filter(AppointmentFilter::Upcoming, None);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, gyn.id);

        let cancelled = registry.filter(AppointmentFilter::Cancelled, None);
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, obs.id);

        let by_specialty = registry.filter(AppointmentFilter::All, Some("obstet"));
        assert_eq!(by_specialty.len(), 1);
        assert_eq!(by_specialty[0].id, obs.id);

        let by_name = registry.filter(AppointmentFilter::All, Some("MÉNDEZ"));
        assert_eq!(by_name.len(), 1);

        assert_eq!(registry.filter(AppointmentFilter::All, Some("  ")).len(), 2);
        assert!(registry.filter(AppointmentFilter::Completed, None).is_empty());
    }

    #[test]
    fn conflicts_ignore_terminal_and_adjacent_slots() {
        let mut registry = AppointmentRegistry::new();
        let base = registry
            .create(request(Role::Doctor, "A", at(2024, 3, 25, 10, 0), at(2024, 3, 25, 11, 0)))
            .unwrap();
        let clash = registry
            .create(request(Role::Doctor, "B", at(2024, 3, 25, 10, 30), at(2024, 3, 25, 11, 30)))
            .unwrap();
        registry
            .create(request(Role::Doctor, "Adjacent", at(2024, 3, 25, 11, 0), at(2024, 3, 25, 12, 0)))
            .unwrap();
        let gone = registry
            .create(request(Role::Doctor, "C", at(2024, 3, 25, 10, 15), at(2024, 3, 25, 10, 45)))
            .unwrap();
        registry.transition(gone.id, AppointmentStatus::Cancelled).unwrap();

        let conflicts = registry.conflicts_for(base.id).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, clash.id);

        assert!(matches!(
            registry.conflicts_for(Uuid::new_v4()),
            Err(AppointmentError::NotFound(_))
        ));
    }

    #[test]
    fn summary_counts_and_next() {
        let mut registry = AppointmentRegistry::new();
        let past = registry
            .create(request(Role::Doctor, "Past", at(2024, 3, 15, 9, 0), at(2024, 3, 15, 10, 0)))
            .unwrap();
        registry.transition(past.id, AppointmentStatus::Completed).unwrap();
        let later = registry
            .create(request(Role::Patient, "Later", at(2024, 4, 2, 14, 0), at(2024, 4, 2, 15, 0)))
            .unwrap();
        let soon = registry
            .create(request(Role::Doctor, "Soon", at(2024, 3, 25, 10, 30), at(2024, 3, 25, 11, 0)))
            .unwrap();

        let summary = registry.summary(at(2024, 3, 20, 0, 0));
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.confirmed, 1);
        assert_eq!(summary.cancelled, 0);
        assert_eq!(summary.upcoming, 2);
        assert_eq!(summary.next.map(|a| a.id), Some(soon.id));

        let after_soon = registry.summary(at(2024, 3, 26, 0, 0));
        assert_eq!(after_soon.upcoming, 1);
        assert_eq!(after_soon.next.map(|a| a.id), Some(later.id));
    }

    // ── booking form ──

    #[test]
    fn booking_form_defaults_to_one_hour() {
        let form = BookingForm {
            subject_name: "María García".into(),
            date: "2024-03-25".into(),
            time: "10:30".into(),
            duration_minutes: None,
            modality: Modality::Virtual,
            notes: None,
            specialty: None,
            location: None,
        };
        let req = form.into_request(Role::Doctor).unwrap();
        assert_eq!(req.start_at, Some(at(2024, 3, 25, 10, 30)));
        assert_eq!(req.end_at, Some(at(2024, 3, 25, 11, 30)));
        assert_eq!(req.modality, Modality::Virtual);
        assert_eq!(req.initiated_by, Role::Doctor);
    }

    #[test]
    fn booking_form_rejects_bad_input() {
        let base = BookingForm {
            subject_name: "María García".into(),
            date: "2024-03-25".into(),
            time: "10:30".into(),
            duration_minutes: Some(30),
            modality: Modality::InPerson,
            notes: None,
            specialty: None,
            location: None,
        };

        let mut bad_date = base.clone();
        bad_date.date = "25/03/2024".into();
        assert!(bad_date.into_request(Role::Patient).is_err());

        let mut bad_time = base.clone();
        bad_time.time = "25:00".into();
        assert!(bad_time.into_request(Role::Patient).is_err());

        let mut zero = base.clone();
        zero.duration_minutes = Some(0);
        assert!(zero.into_request(Role::Patient).is_err());

        let ok = base.into_request(Role::Patient).unwrap();
        assert_eq!(ok.end_at, Some(at(2024, 3, 25, 11, 0)));
    }

    #[test]
    fn booking_form_past_calendar_end_is_rejected() {
        let form = BookingForm {
            subject_name: "María García".into(),
            date: NaiveDate::MAX.format("%Y-%m-%d").to_string(),
            time: "23:30".into(),
            duration_minutes: Some(MAX_DURATION_MINUTES),
            modality: Modality::InPerson,
            notes: None,
            specialty: None,
            location: None,
        };
        assert_eq!(
            form.into_request(Role::Doctor).unwrap_err(),
            AppointmentError::InvalidRequest("Appointment time out of range".into())
        );
    }

    #[test]
    fn new_appointment_without_subject_reaches_validation() {
        let body: NewAppointment = serde_json::from_str(
            r#"{"start_at":"2024-03-25T10:00:00Z","end_at":"2024-03-25T11:00:00Z"}"#,
        )
        .unwrap();
        let mut registry = AppointmentRegistry::new();
        assert_eq!(
            registry.create(body.into_request(Role::Patient)).unwrap_err(),
            AppointmentError::InvalidRequest("Subject name is required".into())
        );
    }

    #[test]
    fn new_appointment_defaults_modality() {
        let body: NewAppointment = serde_json::from_str(
            r#"{"subject_name":"Ana López","start_at":"2024-03-25T10:00:00Z","end_at":"2024-03-25T11:00:00Z"}"#,
        )
        .unwrap();
        let req = body.into_request(Role::Patient);
        assert_eq!(req.modality, Modality::InPerson);
        assert_eq!(req.start_at, Some(at(2024, 3, 25, 10, 0)));
    }
}
