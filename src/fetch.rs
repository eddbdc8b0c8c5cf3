use log::debug;
use reqwest::{Client, StatusCode};
use thiserror::Error;

pub const UPSTREAM: &str = "https://syllabus.naist.jp/schedules/preview_monthly";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with {status}")]
    Status { url: String, status: StatusCode },
}

#[must_use]
pub fn page_url(base: &str, year: i32, month: u32) -> String {
    format!("{}/{year}/{month}", base.trim_end_matches('/'))
}

/// Downloads the monthly schedule page. No retries.
pub async fn fetch_schedule(
    client: &Client,
    base: &str,
    year: i32,
    month: u32,
) -> Result<String, FetchError> {
    let url = page_url(base, year, month);
    let request_error = |source| FetchError::Request {
        url: url.clone(),
        source,
    };

    debug!("Sending HTTP request to {url}");
    let response = client.get(&url).send().await.map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status { url, status });
    }

    debug!("Reading response body");
    response.text().await.map_err(request_error)
}
