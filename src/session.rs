//! Signed-in actor and the appointments it owns.
//!
//! Replaces an ambient "current user" with a value that is handed to
//! whatever needs the actor's identity. Sign-in is a mock: no password is
//! checked and nothing leaves the process.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::appointment::{AppointmentError, AppointmentRegistry, AppointmentRequest, NewAppointment};
use crate::models::{Appointment, Role, User};
use crate::seed;

const MAX_NAME_LEN: usize = 200;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
    #[error("Name is required")]
    MissingName,
    #[error("Name too long")]
    NameTooLong,
}

/// Public view of a session, safe to hand to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub user: User,
    pub appointment_count: usize,
}

/// One signed-in actor and its exclusively owned registry.
#[derive(Debug)]
pub struct Session {
    user: User,
    registry: AppointmentRegistry,
}

impl Session {
    /// Mock login. The display name is fixed per role.
    pub fn sign_in(email: &str, role: Role) -> Result<Self, SessionError> {
        let email = validate_email(email)?;
        let name = match role {
            Role::Doctor => "Dr. Jane Smith",
            Role::Patient => "Maria Garcia",
        };

        tracing::info!(%role, "Mock sign-in");
        Ok(Self::for_user(User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            role,
        }))
    }

    /// Mock registration: the new account is signed in immediately.
    pub fn register(name: &str, email: &str, role: Role) -> Result<Self, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::MissingName);
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(SessionError::NameTooLong);
        }
        let email = validate_email(email)?;

        tracing::info!(%role, "Mock registration");
        Ok(Self::for_user(User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            role,
        }))
    }

    pub fn for_user(user: User) -> Self {
        Self {
            user,
            registry: AppointmentRegistry::new(),
        }
    }

    /// Fill the registry with the demo appointments for this role.
    pub fn with_demo_data(mut self) -> Result<Self, AppointmentError> {
        seed::seed_registry(&mut self.registry, self.user.role)?;
        Ok(self)
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn registry(&self) -> &AppointmentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AppointmentRegistry {
        &mut self.registry
    }

    /// Book on behalf of this actor; the initiator is always the session's role.
    pub fn book(&mut self, new: NewAppointment) -> Result<Appointment, AppointmentError> {
        let request: AppointmentRequest = new.into_request(self.user.role);
        self.registry.create(request)
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            user: self.user.clone(),
            appointment_count: self.registry.len(),
        }
    }
}

fn validate_email(email: &str) -> Result<String, SessionError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(SessionError::MissingEmail);
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(email.to_lowercase())
        }
        _ => Err(SessionError::InvalidEmail(email.to_string())),
    }
}
