use thiserror::Error;

pub type LoadId = u64;

/// Progress of one sheet load, as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetEvent {
    Started {
        load_id: LoadId,
        url: String,
    },
    Progress {
        load_id: LoadId,
        bytes: u64,
    },
    Loaded {
        load_id: LoadId,
        url: String,
        messages: Vec<String>,
        encoding: String,
    },
    Failed {
        load_id: LoadId,
        url: String,
        message: String,
    },
}

/// Raw export body plus what the server said about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetDownload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    /// Address after redirects; sheet exports usually bounce once.
    pub final_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureKind {
    #[error("invalid url")]
    InvalidUrl,
    #[error("http status 403")]
    Forbidden,
    #[error("http status 404")]
    NotFound,
    #[error("http status {0}")]
    HttpStatus(u16),
    /// The server answered with a sign-in page instead of the export.
    #[error("sheet is not shared")]
    NotShared,
    #[error("unsupported content type {0}")]
    UnsupportedContentType(String),
    #[error("export larger than {max_bytes} bytes")]
    TooLarge { max_bytes: u64 },
    #[error("timeout")]
    Timeout,
    #[error("network error")]
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub detail: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Text for the operator panel.
    pub fn operator_message(&self) -> String {
        match &self.kind {
            FailureKind::Forbidden => {
                "permission denied (403): share the sheet with anyone who has the link".to_owned()
            }
            FailureKind::NotShared => {
                "the sheet asks for a sign-in: share it with anyone who has the link".to_owned()
            }
            FailureKind::NotFound => "sheet not found (404): check the URL".to_owned(),
            FailureKind::Network | FailureKind::Timeout => {
                "network error: the sheet must be published or shared publicly".to_owned()
            }
            other => other.to_string(),
        }
    }
}
