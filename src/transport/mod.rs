//! Transport layer between the console and the data-management server.
//!
//! This module defines the interface every transport must implement, the
//! request and response shapes exchanged over it, and its error type.

use async_trait::async_trait;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc;
use url::Url;

pub mod http;

/// Common error types for transport operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Could not read upload '{path}': {detail}")]
    File { path: PathBuf, detail: String },
}

impl BackendError {
    /// The text shown to the user for this failure: the raw body for server
    /// rejections, the error description otherwise
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Server { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

/// Status and raw body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    pub status: u16,
    pub body: String,
}

impl ServerResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One suggestion returned by the lookup endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupItem {
    pub id: String,
    pub label: String,
}

/// Body of the lookup endpoint: `{"count": n, "items": {"id": "label", ...}}`.
///
/// Items keep the order the server sent them in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LookupResult {
    pub count: u64,
    #[serde(deserialize_with = "ordered_items")]
    pub items: Vec<LookupItem>,
}

fn ordered_items<'de, D>(deserializer: D) -> Result<Vec<LookupItem>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ItemsVisitor;

    impl<'de> Visitor<'de> for ItemsVisitor {
        type Value = Vec<LookupItem>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of id to label")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut items = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((id, label)) = map.next_entry::<String, String>()? {
                items.push(LookupItem { id, label });
            }
            Ok(items)
        }
    }

    deserializer.deserialize_map(ItemsVisitor)
}

/// A file chosen in a binary-upload widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

/// One submitted form value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadValue {
    Text(String),
    File(SelectedFile),
}

impl PayloadValue {
    /// Bytes this value contributes to the request body
    pub fn len(&self) -> u64 {
        match self {
            PayloadValue::Text(text) => text.len() as u64,
            PayloadValue::File(file) => file.size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A write request: the form's fields plus the injected action identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub url: Url,
    pub fields: Vec<(String, PayloadValue)>,
}

impl SubmitRequest {
    /// Total bytes the request body will carry, excluding multipart framing
    pub fn payload_len(&self) -> u64 {
        self.fields.iter().map(|(_, value)| value.len()).sum()
    }

    /// Value of a text field
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|(field, value)| match value {
            PayloadValue::Text(text) if field == name => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Cumulative transfer counters reported while a request body is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSample {
    pub loaded: u64,
    pub total: u64,
}

pub type ProgressSender = mpsc::UnboundedSender<TransferSample>;

/// Transport interface used by every console component.
///
/// A non-2xx status from the fragment or submission endpoints is not an error
/// at this level: the raw body is what the user gets to see.
#[async_trait]
pub trait ConsoleBackend: Send + Sync {
    /// GET a view fragment
    async fn fetch_fragment(&self, url: &Url) -> Result<ServerResponse, BackendError>;

    /// GET the names of the server-defined custom types
    async fn fetch_type_names(&self) -> Result<Vec<String>, BackendError>;

    /// GET one page of lookup suggestions
    async fn lookup(&self, url: &Url) -> Result<LookupResult, BackendError>;

    /// POST a form, reporting body transfer progress when a sender is given
    async fn submit(
        &self,
        request: SubmitRequest,
        progress: Option<ProgressSender>,
    ) -> Result<ServerResponse, BackendError>;
}
