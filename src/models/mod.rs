pub mod appointment;
pub mod enums;
pub mod user;

pub use appointment::Appointment;
pub use enums::{AppointmentFilter, AppointmentStatus, Modality, ParseEnumError, Role};
pub use user::User;
