use std::path::Path;

use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use google_calendar3::{
    api::{Event as CalendarEvent, EventDateTime},
    common::GetToken,
    hyper_rustls, hyper_util,
    yup_oauth2::{read_service_account_key, ServiceAccountAuthenticator, ServiceAccountKey},
    CalendarHub, Error as ApiError,
};
use log::debug;

use crate::sink::{AuthError, CalendarApi, EventBody, InsertError};

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const JST_OFFSET_HOURS: i64 = 9;

/// Reasons Google attaches to a 403 when the request was throttled rather
/// than refused.
const THROTTLE_REASONS: [&str; 4] = [
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "quotaExceeded",
    "dailyLimitExceeded",
];

type Connector = hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// Target calendar and the service account allowed to write to it.
pub struct Credentials {
    pub calendar_id: String,
    pub key: ServiceAccountKey,
}

impl Credentials {
    pub async fn load(calendar_id_path: &Path, key_path: &Path) -> Result<Self, AuthError> {
        let calendar_id = tokio::fs::read_to_string(calendar_id_path)
            .await
            .map_err(|source| AuthError::CalendarIdFile {
                path: calendar_id_path.display().to_string(),
                source,
            })?
            .trim()
            .to_string();

        if calendar_id.is_empty() {
            return Err(AuthError::EmptyCalendarId(
                calendar_id_path.display().to_string(),
            ));
        }

        let key = read_service_account_key(key_path)
            .await
            .map_err(|source| AuthError::KeyFile {
                path: key_path.display().to_string(),
                source,
            })?;

        Ok(Self { calendar_id, key })
    }
}

pub struct GoogleCalendar {
    hub: CalendarHub<Connector>,
}

impl GoogleCalendar {
    pub async fn connect(key: ServiceAccountKey) -> Result<Self, AuthError> {
        let auth = ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(AuthError::Authenticator)?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(AuthError::Authenticator)?
            .https_or_http()
            .enable_http1()
            .build();

        let client =
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build(connector);

        Ok(Self {
            hub: CalendarHub::new(client, auth),
        })
    }
}

impl CalendarApi for GoogleCalendar {
    async fn authorize(&self) -> Result<(), AuthError> {
        match self.hub.auth.get_token(&[CALENDAR_SCOPE]).await {
            Ok(Some(_)) => {
                debug!("Obtained access token for {CALENDAR_SCOPE}");
                Ok(())
            }
            Ok(None) => Err(AuthError::Token("no token issued".into())),
            Err(err) => Err(AuthError::Token(err.to_string())),
        }
    }

    async fn insert(&self, calendar_id: &str, body: &EventBody) -> Result<(), InsertError> {
        let event = CalendarEvent {
            summary: Some(body.summary.clone()),
            location: Some(body.location.clone()),
            description: Some(body.description.clone()),
            start: Some(event_time(body.start, body.time_zone)),
            end: Some(event_time(body.end, body.time_zone)),
            ..Default::default()
        };

        self.hub
            .events()
            .insert(event, calendar_id)
            .add_scope(CALENDAR_SCOPE)
            .doit()
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

/// Calendar API wants an instant; the wall-clock time is JST.
fn event_time(local: NaiveDateTime, time_zone: &str) -> EventDateTime {
    let instant = Utc.from_utc_datetime(&(local - Duration::hours(JST_OFFSET_HOURS)));

    EventDateTime {
        date_time: Some(instant.into()),
        time_zone: Some(time_zone.to_string()),
        ..Default::default()
    }
}

fn classify(err: ApiError) -> InsertError {
    match err {
        ApiError::HttpError(err) => InsertError::Transient(err.to_string()),
        ApiError::Io(err) => InsertError::Transient(err.to_string()),
        ApiError::MissingToken(err) => InsertError::Unauthorized(err.to_string()),
        ApiError::Failure(response) => {
            let status = response.status();
            by_status(status.as_u16(), status.to_string())
        }
        ApiError::BadRequest(value) => {
            let throttled = value["error"]["errors"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|error| error["reason"].as_str())
                .any(|reason| THROTTLE_REASONS.contains(&reason));

            if throttled {
                return InsertError::Transient(value.to_string());
            }

            let code = value["error"]["code"].as_u64().unwrap_or(400);
            by_status(u16::try_from(code).unwrap_or(400), value.to_string())
        }
        other => InsertError::Rejected(other.to_string()),
    }
}

fn by_status(status: u16, message: String) -> InsertError {
    match status {
        401 | 403 => InsertError::Unauthorized(message),
        429 | 500..=599 => InsertError::Transient(message),
        _ => InsertError::Rejected(message),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn local_time_becomes_utc_instant() {
        let local = NaiveDate::from_ymd_opt(2024, 4, 5)
            .unwrap()
            .and_hms_opt(9, 20, 0)
            .unwrap();

        let time = event_time(local, "Asia/Tokyo");

        assert_eq!(time.time_zone.as_deref(), Some("Asia/Tokyo"));
        assert_eq!(
            time.date_time.map(|instant| instant.with_timezone(&Utc).to_rfc3339()),
            Some("2024-04-05T00:20:00+00:00".to_string())
        );
    }

    #[test]
    fn statuses_map_to_retry_policy() {
        assert_eq!(by_status(503, "x".into()), InsertError::Transient("x".into()));
        assert_eq!(by_status(429, "x".into()), InsertError::Transient("x".into()));
        assert_eq!(by_status(403, "x".into()), InsertError::Unauthorized("x".into()));
        assert_eq!(by_status(400, "x".into()), InsertError::Rejected("x".into()));
    }

    #[test]
    fn error_bodies_are_classified_by_code() {
        let body = serde_json::json!({ "error": { "code": 403, "message": "insufficient scope" } });

        assert!(matches!(
            classify(ApiError::BadRequest(body)),
            InsertError::Unauthorized(_)
        ));
    }

    #[test]
    fn throttled_403_is_retried() {
        for reason in ["rateLimitExceeded", "userRateLimitExceeded", "quotaExceeded"] {
            let body = serde_json::json!({
                "error": {
                    "code": 403,
                    "errors": [{ "domain": "usageLimits", "reason": reason }],
                }
            });

            assert!(
                matches!(classify(ApiError::BadRequest(body)), InsertError::Transient(_)),
                "{reason}"
            );
        }
    }

    #[test]
    fn permission_403_stays_unauthorized() {
        let body = serde_json::json!({
            "error": {
                "code": 403,
                "errors": [{ "domain": "global", "reason": "insufficientPermissions" }],
            }
        });

        assert!(matches!(
            classify(ApiError::BadRequest(body)),
            InsertError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn calendar_id_is_read_and_trimmed() {
        let dir = std::env::temp_dir().join(format!("naist-calendar-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let calendar_id_path = dir.join("calendar_id");
        tokio::fs::write(&calendar_id_path, "  \n").await.unwrap();

        let result = Credentials::load(&calendar_id_path, &dir.join("missing-key.json")).await;
        assert!(matches!(result, Err(AuthError::EmptyCalendarId(_))));

        tokio::fs::write(&calendar_id_path, "abc@group.calendar.google.com\n")
            .await
            .unwrap();

        let result = Credentials::load(&calendar_id_path, &dir.join("missing-key.json")).await;
        assert!(matches!(result, Err(AuthError::KeyFile { .. })));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
