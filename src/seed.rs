//! Demo appointments a fresh session starts with.
//!
//! All data here is fictional. Entries are booked through the public
//! registry API and walked to their target status, so the seeded set obeys
//! the same lifecycle rules as user-created appointments.

use crate::appointment::{AppointmentError, AppointmentRegistry, BookingForm};
use crate::models::{AppointmentStatus, Modality, Role};

struct DemoAppointment {
    subject: &'static str,
    specialty: Option<&'static str>,
    date: &'static str,
    time: &'static str,
    minutes: u32,
    modality: Modality,
    location: &'static str,
    notes: &'static str,
    status: AppointmentStatus,
}

const PATIENT_DEMO: &[DemoAppointment] = &[
    DemoAppointment {
        subject: "Dra. Ana Méndez",
        specialty: Some("Ginecología"),
        date: "2024-03-25",
        time: "10:30",
        minutes: 30,
        modality: Modality::InPerson,
        location: "Clínica Central, Consultorio 305",
        notes: "Control de rutina",
        status: AppointmentStatus::Confirmed,
    },
    DemoAppointment {
        subject: "Dra. Carmen López",
        specialty: Some("Obstetricia"),
        date: "2024-04-02",
        time: "14:00",
        minutes: 30,
        modality: Modality::Virtual,
        location: "Videollamada",
        notes: "Revisión de resultados",
        status: AppointmentStatus::Pending,
    },
    DemoAppointment {
        subject: "Dra. Ana Méndez",
        specialty: Some("Ginecología"),
        date: "2024-03-15",
        time: "09:00",
        minutes: 30,
        modality: Modality::InPerson,
        location: "Clínica Central, Consultorio 305",
        notes: "Consulta inicial",
        status: AppointmentStatus::Completed,
    },
];

const DOCTOR_DEMO: &[DemoAppointment] = &[
    DemoAppointment {
        subject: "María García",
        specialty: None,
        date: "2024-03-20",
        time: "09:00",
        minutes: 60,
        modality: Modality::InPerson,
        location: "Clínica Central, Consultorio 305",
        notes: "Control Prenatal",
        status: AppointmentStatus::Confirmed,
    },
    DemoAppointment {
        subject: "Ana López",
        specialty: None,
        date: "2024-03-20",
        time: "11:00",
        minutes: 60,
        modality: Modality::Virtual,
        location: "Videollamada",
        notes: "Seguimiento",
        status: AppointmentStatus::Confirmed,
    },
    DemoAppointment {
        subject: "Carmen Rodríguez",
        specialty: None,
        date: "2024-03-18",
        time: "16:00",
        minutes: 60,
        modality: Modality::InPerson,
        location: "Clínica Central, Consultorio 305",
        notes: "Resultados de laboratorio",
        status: AppointmentStatus::Completed,
    },
];

/// Book the demo set for `role` into `registry`. Returns how many were added.
pub fn seed_registry(registry: &mut AppointmentRegistry, role: Role) -> Result<usize, AppointmentError> {
    let demo = match role {
        Role::Doctor => DOCTOR_DEMO,
        Role::Patient => PATIENT_DEMO,
    };

    for entry in demo {
        let form = BookingForm {
            subject_name: entry.subject.to_string(),
            date: entry.date.to_string(),
            time: entry.time.to_string(),
            duration_minutes: Some(entry.minutes),
            modality: entry.modality,
            notes: Some(entry.notes.to_string()),
            specialty: entry.specialty.map(str::to_string),
            location: Some(entry.location.to_string()),
        };
        let created = registry.create(form.into_request(role)?)?;
        for step in path_to(created.status, entry.status) {
            registry.transition(created.id, *step)?;
        }
    }

    tracing::debug!(%role, count = demo.len(), "Seeded demo appointments");
    Ok(demo.len())
}

/// Lifecycle steps from a booking's initial status to a demo target.
fn path_to(from: AppointmentStatus, to: AppointmentStatus) -> &'static [AppointmentStatus] {
    use AppointmentStatus::*;
    match (from, to) {
        (Pending, Confirmed) => &[Confirmed],
        (Pending, Completed) => &[Confirmed, Completed],
        (Pending | Confirmed, Cancelled) => &[Cancelled],
        (Confirmed, Completed) => &[Completed],
        (Confirmed, Pending) => &[Pending],
        _ => &[],
    }
}
