use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unknown string for a closed enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid enum value for {field}: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$attr:meta])* $variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        $(#[$meta])*
        pub enum $name {
            $($(#[$attr])* $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Doctor => "doctor",
    Patient => "patient",
});

// The booking modal preselects an in-person visit.
str_enum!(#[derive(Default)] Modality {
    #[default]
    InPerson => "in_person",
    Virtual => "virtual",
});

str_enum!(AppointmentStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(#[derive(Default)] AppointmentFilter {
    #[default]
    All => "all",
    Upcoming => "upcoming",
    Pending => "pending",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl Role {
    /// Status a freshly booked appointment starts in.
    /// Patients request, doctors book directly.
    pub fn initial_status(self) -> AppointmentStatus {
        match self {
            Self::Doctor => AppointmentStatus::Confirmed,
            Self::Patient => AppointmentStatus::Pending,
        }
    }
}

impl AppointmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Pending or confirmed: still on the calendar.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, Pending)
        )
    }
}

impl AppointmentFilter {
    pub fn matches(self, status: AppointmentStatus) -> bool {
        match self {
            Self::All => true,
            Self::Upcoming => status.is_active(),
            Self::Pending => status == AppointmentStatus::Pending,
            Self::Confirmed => status == AppointmentStatus::Confirmed,
            Self::Completed => status == AppointmentStatus::Completed,
            Self::Cancelled => status == AppointmentStatus::Cancelled,
        }
    }
}
