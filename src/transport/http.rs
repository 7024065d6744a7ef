//! HTTP transport over reqwest.

use super::{
    BackendError, ConsoleBackend, LookupResult, PayloadValue, ProgressSender, ServerResponse, SubmitRequest,
    TransferSample,
};
use crate::constants::TYPE_NAMES_PATH;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

/// Size of the slices an upload body is streamed in; one progress sample per slice.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// HTTP transport talking to the data-management server.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: Url) -> Result<Self, BackendError> {
        let client = Client::builder()
            .build()
            .map_err(|e| BackendError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn execute(&self, request_builder: RequestBuilder, method: &str, url: &Url) -> Result<ServerResponse, BackendError> {
        log::debug!("[http] {} {}", method, url);

        let response = request_builder
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        log::debug!("[http] Response status: {}", status);

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Network(format!("Failed to read response body: {}", e)))?;

        Ok(ServerResponse { status, body })
    }

    async fn get_ok(&self, url: &Url) -> Result<String, BackendError> {
        let response = self.execute(self.client.get(url.clone()), "GET", url).await?;

        if response.is_ok() {
            Ok(response.body)
        } else {
            log::warn!("[http] GET {} failed with status {}", url, response.status);
            Err(BackendError::Server {
                status: response.status,
                body: response.body,
            })
        }
    }

    async fn multipart_form(request: SubmitRequest, progress: Option<ProgressSender>) -> Result<Form, BackendError> {
        let total = request.payload_len();
        let loaded = Arc::new(AtomicU64::new(0));
        let mut form = Form::new();

        for (name, value) in request.fields {
            match value {
                PayloadValue::Text(text) => {
                    report(&progress, &loaded, text.len() as u64, total);
                    form = form.text(name, text);
                }
                PayloadValue::File(file) => {
                    let bytes = tokio::fs::read(&file.path).await.map_err(|e| BackendError::File {
                        path: file.path.clone(),
                        detail: e.to_string(),
                    })?;
                    let length = bytes.len() as u64;

                    let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK_SIZE).map(<[u8]>::to_vec).collect();
                    let progress = progress.clone();
                    let loaded = Arc::clone(&loaded);
                    let body = stream::iter(chunks).map(move |chunk| {
                        report(&progress, &loaded, chunk.len() as u64, total);
                        Ok::<Vec<u8>, std::io::Error>(chunk)
                    });

                    let part = Part::stream_with_length(Body::wrap_stream(body), length).file_name(file.file_name);
                    form = form.part(name, part);
                }
            }
        }

        Ok(form)
    }
}

fn report(progress: &Option<ProgressSender>, loaded: &AtomicU64, sent: u64, total: u64) {
    let loaded = loaded.fetch_add(sent, Ordering::Relaxed) + sent;

    if let Some(sender) = progress {
        // The receiver is gone once the submission has been canceled.
        let _ = sender.send(TransferSample { loaded, total });
    }
}

#[async_trait]
impl ConsoleBackend for HttpBackend {
    async fn fetch_fragment(&self, url: &Url) -> Result<ServerResponse, BackendError> {
        self.execute(self.client.get(url.clone()), "GET", url).await
    }

    async fn fetch_type_names(&self) -> Result<Vec<String>, BackendError> {
        let url = self
            .base_url
            .join(TYPE_NAMES_PATH)
            .map_err(|e| BackendError::InvalidData(format!("Invalid type listing URL: {}", e)))?;

        let body = self.get_ok(&url).await?;
        serde_json::from_str(&body).map_err(|e| BackendError::InvalidData(format!("Invalid type listing: {}", e)))
    }

    async fn lookup(&self, url: &Url) -> Result<LookupResult, BackendError> {
        let body = self.get_ok(url).await?;
        serde_json::from_str(&body).map_err(|e| BackendError::InvalidData(format!("Invalid lookup result: {}", e)))
    }

    async fn submit(
        &self,
        request: SubmitRequest,
        progress: Option<ProgressSender>,
    ) -> Result<ServerResponse, BackendError> {
        let url = request.url.clone();
        let form = Self::multipart_form(request, progress).await?;

        self.execute(self.client.post(url.clone()).multipart(form), "POST", &url).await
    }
}
