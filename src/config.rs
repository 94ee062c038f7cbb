use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Application-level constants
pub const APP_NAME: &str = "CarePortal";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Slot length the booking form uses when no duration is given.
pub const DEFAULT_APPOINTMENT_MINUTES: u32 = 60;

pub const DEFAULT_PORT: u16 = 8787;

/// Concurrent sign-ins kept before the least recently used is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

const ENV_BIND: &str = "CAREPORTAL_BIND";
const ENV_PORT: &str = "CAREPORTAL_PORT";
const ENV_SEED_DEMO: &str = "CAREPORTAL_SEED_DEMO";
const ENV_MAX_SESSIONS: &str = "CAREPORTAL_MAX_SESSIONS";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,careportal=debug,tower_http=info"
}

/// HTTP server settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Fill new sessions with the demo appointments.
    pub seed_demo: bool,
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            seed_demo: true,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable values fall back to the default and are logged.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind = parse_or(ENV_BIND, lookup(ENV_BIND), defaults.bind);
        let port = parse_or(ENV_PORT, lookup(ENV_PORT), defaults.port);
        let seed_demo = match lookup(ENV_SEED_DEMO).as_deref().map(str::trim) {
            None => defaults.seed_demo,
            Some("1" | "true" | "yes") => true,
            Some("0" | "false" | "no") => false,
            Some(other) => {
                tracing::warn!(key = ENV_SEED_DEMO, value = other, "Ignoring invalid setting");
                defaults.seed_demo
            }
        };

        let max_sessions = parse_or(ENV_MAX_SESSIONS, lookup(ENV_MAX_SESSIONS), defaults.max_sessions);
        let max_sessions = match max_sessions {
            0 => {
                tracing::warn!(key = ENV_MAX_SESSIONS, "Ignoring zero session limit");
                defaults.max_sessions
            }
            n => n,
        };

        Self {
            bind,
            port,
            seed_demo,
            max_sessions,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %value, "Ignoring invalid setting");
            default
        }),
    }
}
