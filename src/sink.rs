use std::time::Duration;

use chrono::NaiveDateTime;
use log::{error, info, warn};
use naist_schedule::Event;
use thiserror::Error;

pub const TIME_ZONE: &str = "Asia/Tokyo";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("could not read calendar id from {path}: {source}")]
    CalendarIdFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("calendar id file {0} is empty")]
    EmptyCalendarId(String),
    #[error("could not read service account key from {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not build authenticator: {0}")]
    Authenticator(#[source] std::io::Error),
    #[error("could not obtain an access token: {0}")]
    Token(String),
    #[error("calendar refused the credentials: {0}")]
    Unauthorized(String),
}

/// Outcome of a single insert call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

/// Why an event did not make it into the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("insert rejected: {0}")]
    Rejected(String),
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Request body for one calendar entry, in local (JST) wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBody {
    pub summary: String,
    pub location: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub time_zone: &'static str,
}

impl From<&Event> for EventBody {
    fn from(event: &Event) -> Self {
        Self {
            summary: event.class.clone(),
            location: event.classroom.clone(),
            description: event.description(),
            start: event.starttime,
            end: event.endtime,
            time_zone: TIME_ZONE,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait CalendarApi {
    /// Obtains write access. Called once before any insert.
    async fn authorize(&self) -> Result<(), AuthError>;

    async fn insert(&self, calendar_id: &str, body: &EventBody) -> Result<(), InsertError>;
}

#[allow(async_fn_in_trait)]
pub trait Pacer {
    async fn pause(&self, duration: Duration);
}

pub struct TokioPacer;

impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingPolicy {
    /// Pause between two consecutive inserts.
    pub interval: Duration,
    /// Extra attempts after a transient failure.
    pub max_retries: u32,
    /// First retry delay, doubled for each further retry.
    pub initial_backoff: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1250),
            max_retries: 3,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

impl PacingPolicy {
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(retry))
    }
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub inserted: usize,
    pub failures: Vec<(String, SinkError)>,
    /// Set when the calendar refused the credentials partway through; the
    /// remaining events were not attempted.
    pub aborted: Option<AuthError>,
}

pub struct CalendarSink<A, P> {
    api: A,
    pacer: P,
    calendar_id: String,
    policy: PacingPolicy,
}

impl<A: CalendarApi, P: Pacer> CalendarSink<A, P> {
    pub fn new(api: A, pacer: P, calendar_id: String, policy: PacingPolicy) -> Self {
        Self {
            api,
            pacer,
            calendar_id,
            policy,
        }
    }

    /// Inserts every event in order. Individual failures are collected in the
    /// report. Credentials refused up front fail the whole call; refused later
    /// they end the run with what was inserted so far.
    pub async fn send(&self, events: &[Event]) -> Result<SyncReport, AuthError> {
        self.api.authorize().await?;

        let mut report = SyncReport::default();

        for (idx, event) in events.iter().enumerate() {
            if idx > 0 {
                self.pacer.pause(self.policy.interval).await;
            }

            let label = format!("{} {}", event.cell_id(), event.class);

            let outcome = match self.insert(event).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!("Stopping at {label}: {err}");
                    report.aborted = Some(err);
                    break;
                }
            };

            match outcome {
                Ok(()) => {
                    info!("Inserted {label}");
                    report.inserted += 1;
                }
                Err(err) => {
                    warn!("Failed to insert {label}: {err}");
                    report.failures.push((label, err));
                }
            }
        }

        Ok(report)
    }

    async fn insert(&self, event: &Event) -> Result<Result<(), SinkError>, AuthError> {
        let body = EventBody::from(event);
        let mut retry = 0;

        loop {
            match self.api.insert(&self.calendar_id, &body).await {
                Ok(()) => return Ok(Ok(())),
                Err(InsertError::Unauthorized(msg)) => return Err(AuthError::Unauthorized(msg)),
                Err(InsertError::Rejected(msg)) => return Ok(Err(SinkError::Rejected(msg))),
                Err(InsertError::Transient(msg)) if retry >= self.policy.max_retries => {
                    return Ok(Err(SinkError::RetriesExhausted {
                        attempts: retry + 1,
                        last: msg,
                    }));
                }
                Err(InsertError::Transient(msg)) => {
                    let delay = self.policy.backoff(retry);
                    warn!("Retrying {} in {delay:?}: {msg}", body.summary);
                    self.pacer.pause(delay).await;
                    retry += 1;
                }
            }
        }
    }
}
