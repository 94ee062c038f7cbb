//! Transport-agnostic application state.
//!
//! `CoreState` owns every signed-in `Session`, keyed by the SHA-256 of the
//! bearer token handed out at sign-in, plus the in-memory access audit
//! trail. Each session sits behind its own `Mutex`: one actor's requests
//! are serialised, different actors never contend. The map is bounded by
//! `ServerConfig::max_sessions`; the least recently used session goes first.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::appointment::AppointmentError;
use crate::config::ServerConfig;
use crate::models::Role;
use crate::session::{Session, SessionError};

/// Audit entries kept in memory before the oldest are dropped.
const AUDIT_BUFFER_CAPACITY: usize = 500;

pub type TokenHash = [u8; 32];
pub type SharedSession = Arc<Mutex<Session>>;

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

/// A stored session plus the tick of its last use.
struct SessionSlot {
    session: SharedSession,
    last_used: AtomicU64,
}

pub struct CoreState {
    sessions: RwLock<HashMap<TokenHash, SessionSlot>>,
    /// Monotonic use counter; higher is more recent.
    clock: AtomicU64,
    pub config: ServerConfig,
    audit: AuditLogger,
}

impl CoreState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
            config,
            audit: AuditLogger::new(),
        }
    }

    // ── Sessions ────────────────────────────────────────────

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Register a signed-in session under its token hash.
    /// Seeds demo appointments when the configuration asks for it.
    /// At capacity, the least recently used session is signed out.
    pub fn insert_session(
        &self,
        token_hash: TokenHash,
        session: Session,
    ) -> Result<SharedSession, CoreError> {
        let session = if self.config.seed_demo {
            session.with_demo_data()?
        } else {
            session
        };

        let shared = Arc::new(Mutex::new(session));
        let mut sessions = self.sessions.write().map_err(|_| CoreError::LockPoisoned)?;

        if !sessions.contains_key(&token_hash) && sessions.len() >= self.config.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, slot)| slot.last_used.load(Ordering::Relaxed))
                .map(|(hash, _)| *hash);
            if let Some(hash) = oldest {
                sessions.remove(&hash);
                tracing::info!(
                    max_sessions = self.config.max_sessions,
                    "Evicted least recently used session"
                );
            }
        }

        sessions.insert(
            token_hash,
            SessionSlot {
                session: shared.clone(),
                last_used: AtomicU64::new(self.tick()),
            },
        );
        tracing::debug!(active_sessions = sessions.len(), "Session registered");
        Ok(shared)
    }

    /// Look up the session a token belongs to, marking it as used.
    pub fn session(&self, token_hash: &TokenHash) -> Result<SharedSession, CoreError> {
        let sessions = self.sessions.read().map_err(|_| CoreError::LockPoisoned)?;
        let slot = sessions.get(token_hash).ok_or(CoreError::NoActiveSession)?;
        slot.last_used.store(self.tick(), Ordering::Relaxed);
        Ok(slot.session.clone())
    }

    /// Sign out. Returns whether a session was present.
    pub fn remove_session(&self, token_hash: &TokenHash) -> Result<bool, CoreError> {
        let mut sessions = self.sessions.write().map_err(|_| CoreError::LockPoisoned)?;
        let removed = sessions.remove(token_hash).is_some();
        if removed {
            tracing::info!(active_sessions = sessions.len(), "Session ended");
        }
        Ok(removed)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    // ── Audit logging ───────────────────────────────────────

    pub fn log_access(&self, source: AccessSource, action: &str, outcome: &str) {
        tracing::info!(%source, action, outcome, "access");
        self.audit.log(source, action, outcome);
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }
}

impl Default for CoreState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

/// Lock one session for the duration of a request.
pub fn lock_session(shared: &SharedSession) -> Result<MutexGuard<'_, Session>, CoreError> {
    shared.lock().map_err(|_| CoreError::LockPoisoned)
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("No active session")]
    NoActiveSession,
    #[error("Internal lock error")]
    LockPoisoned,
    #[error(transparent)]
    Appointment(#[from] AppointmentError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

// ═══════════════════════════════════════════════════════════
// Access source tracking
// ═══════════════════════════════════════════════════════════

/// Who touched the data, for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessSource {
    /// Request without a valid session.
    Anonymous,
    /// A signed-in doctor or patient.
    Actor { user_id: Uuid, role: Role },
}

impl std::fmt::Display for AccessSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Actor { user_id, role } => write!(f, "{role}:{user_id}"),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Audit logger
// ═══════════════════════════════════════════════════════════

/// Bounded in-memory audit trail. Oldest entries fall off first.
pub struct AuditLogger {
    buffer: Mutex<VecDeque<AuditEntry>>,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub source: AccessSource,
    pub action: String,
    pub outcome: String,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(AUDIT_BUFFER_CAPACITY)),
        }
    }

    pub fn log(&self, source: AccessSource, action: &str, outcome: &str) {
        if let Ok(mut buf) = self.buffer.lock() {
            if buf.len() == AUDIT_BUFFER_CAPACITY {
                buf.pop_front();
            }
            buf.push_back(AuditEntry {
                timestamp: Utc::now(),
                source,
                action: action.to_string(),
                outcome: outcome.to_string(),
            });
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}
