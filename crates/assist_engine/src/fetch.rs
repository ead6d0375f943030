use std::sync::mpsc::Sender;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::StatusCode;

use crate::types::{FailureKind, FetchError, LoadId, SheetDownload, SheetEvent};

/// Progress is reported once per this many downloaded bytes, plus once at the end.
const PROGRESS_STEP: u64 = 16 * 1024;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub max_bytes: u64,
    /// Media types accepted for the export body, compared without parameters.
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_redirects: 5,
            max_bytes: 2 * 1024 * 1024,
            allowed_content_types: [
                "text/csv",
                "text/plain",
                "application/csv",
                "application/octet-stream",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: SheetEvent);
}

pub struct ChannelProgressSink {
    tx: Sender<SheetEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: Sender<SheetEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: SheetEvent) {
        let _ = self.tx.send(event);
    }
}

pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: SheetEvent) {}
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        load_id: LoadId,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<SheetDownload, FetchError>;
}

/// Downloads spreadsheet CSV exports over HTTP.
#[derive(Debug, Clone)]
pub struct SheetFetcher {
    settings: FetchSettings,
}

impl SheetFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn client(&self) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .timeout(self.settings.timeout)
            .redirect(Policy::limited(self.settings.max_redirects))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn check_content_type(&self, header: Option<&str>) -> Result<(), FetchError> {
        let Some(header) = header else {
            return Ok(());
        };
        let media = media_type(header);
        if media == "text/html" {
            return Err(FetchError::new(FailureKind::NotShared, header));
        }
        if self
            .settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&media))
        {
            Ok(())
        } else {
            Err(FetchError::new(FailureKind::UnsupportedContentType(media), header))
        }
    }

    fn too_large(&self, seen: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
            },
            format!("at least {seen} bytes"),
        )
    }
}

fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or(header)
        .trim()
        .to_ascii_lowercase()
}

fn status_error(status: StatusCode) -> FetchError {
    let kind = match status {
        StatusCode::FORBIDDEN => FailureKind::Forbidden,
        StatusCode::NOT_FOUND => FailureKind::NotFound,
        other => FailureKind::HttpStatus(other.as_u16()),
    };
    FetchError::new(kind, status.to_string())
}

fn transport_error(err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Network
    };
    FetchError::new(kind, err.to_string())
}

#[async_trait::async_trait]
impl Fetcher for SheetFetcher {
    async fn fetch(
        &self,
        load_id: LoadId,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<SheetDownload, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let response = self
            .client()?
            .get(parsed)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        self.check_content_type(content_type.as_deref())?;
        if let Some(declared) = response.content_length() {
            if declared > self.settings.max_bytes {
                return Err(self.too_large(declared));
            }
        }

        let final_url = response.url().to_string();
        let mut bytes = Vec::new();
        let mut reported = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transport_error)?;
            let total = (bytes.len() + chunk.len()) as u64;
            if total > self.settings.max_bytes {
                return Err(self.too_large(total));
            }
            bytes.extend_from_slice(&chunk);
            if total - reported >= PROGRESS_STEP {
                reported = total;
                sink.emit(SheetEvent::Progress { load_id, bytes: total });
            }
        }
        sink.emit(SheetEvent::Progress {
            load_id,
            bytes: bytes.len() as u64,
        });

        Ok(SheetDownload {
            bytes,
            content_type,
            final_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_drops_parameters() {
        assert_eq!(media_type("Text/CSV; charset=Shift_JIS"), "text/csv");
    }

    #[test]
    fn sign_in_page_is_not_shared() {
        let fetcher = SheetFetcher::new(FetchSettings::default());
        let err = fetcher
            .check_content_type(Some("text/html; charset=utf-8"))
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::NotShared);
        assert!(fetcher.check_content_type(None).is_ok());
        assert_eq!(
            fetcher.check_content_type(Some("image/png")).unwrap_err().kind,
            FailureKind::UnsupportedContentType("image/png".to_owned())
        );
    }
}
