#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use typeconsole::config::{FormConfig, StringsConfig};
use typeconsole::console::{Action, Console, PageSession};
use typeconsole::logger::Logger;
use typeconsole::transport::{
    BackendError, ConsoleBackend, LookupItem, LookupResult, ProgressSender, ServerResponse, SubmitRequest,
    TransferSample,
};
use url::Url;

pub const PAGE_URL: &str = "http://localhost:8080/en/product";

pub fn page_url() -> Url {
    Url::parse(PAGE_URL).unwrap()
}

pub fn form_config() -> FormConfig {
    FormConfig::new(Url::parse("http://localhost:8080/en/product").unwrap())
}

/// In-memory server recording every request it receives
pub struct MockBackend {
    pub fragment_response: Mutex<Result<ServerResponse, BackendError>>,
    pub submit_response: Mutex<Result<ServerResponse, BackendError>>,
    pub type_names: Mutex<Result<Vec<String>, BackendError>>,
    pub fragment_urls: Mutex<Vec<Url>>,
    pub lookup_urls: Mutex<Vec<Url>>,
    pub submissions: Mutex<Vec<SubmitRequest>>,
    /// Lookups whose search text contains this fail
    pub failing_search: Mutex<Option<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            fragment_response: Mutex::new(Ok(ServerResponse::ok("<div class=\"select\"></div>"))),
            submit_response: Mutex::new(Ok(ServerResponse::ok("Done"))),
            type_names: Mutex::new(Ok(vec!["address".to_string()])),
            fragment_urls: Mutex::new(Vec::new()),
            lookup_urls: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            failing_search: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_fragment(self, response: ServerResponse) -> Self {
        *self.fragment_response.lock().unwrap() = Ok(response);
        self
    }

    pub fn with_submit_response(self, response: ServerResponse) -> Self {
        *self.submit_response.lock().unwrap() = Ok(response);
        self
    }

    pub fn with_type_names_error(self, error: BackendError) -> Self {
        *self.type_names.lock().unwrap() = Err(error);
        self
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl ConsoleBackend for MockBackend {
    async fn fetch_fragment(&self, url: &Url) -> Result<ServerResponse, BackendError> {
        self.fragment_urls.lock().unwrap().push(url.clone());
        self.fragment_response.lock().unwrap().clone()
    }

    async fn fetch_type_names(&self) -> Result<Vec<String>, BackendError> {
        self.type_names.lock().unwrap().clone()
    }

    async fn lookup(&self, url: &Url) -> Result<LookupResult, BackendError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        self.lookup_urls.lock().unwrap().push(url.clone());

        let search = url
            .query_pairs()
            .find(|(name, _)| name == "search")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();

        // Shorter texts answer more slowly, so early requests would overtake late ones if run concurrently.
        let delay = 40u64.saturating_sub(search.len() as u64 * 10);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failing = self.failing_search.lock().unwrap().clone();
        if failing.map(|text| search.contains(&text)).unwrap_or(false) {
            return Err(BackendError::Server {
                status: 500,
                body: format!("lookup of '{}' failed", search),
            });
        }

        Ok(LookupResult {
            count: 1,
            items: vec![LookupItem {
                id: search.len().to_string(),
                label: search,
            }],
        })
    }

    async fn submit(
        &self,
        request: SubmitRequest,
        progress: Option<ProgressSender>,
    ) -> Result<ServerResponse, BackendError> {
        let total = request.payload_len();
        self.submissions.lock().unwrap().push(request);

        if let Some(progress) = progress {
            let _ = progress.send(TransferSample { loaded: total / 2, total });
            let _ = progress.send(TransferSample { loaded: total, total });
        }

        self.submit_response.lock().unwrap().clone()
    }
}

pub fn console(backend: std::sync::Arc<MockBackend>) -> Console {
    Console::new(
        PageSession::new(page_url(), "en"),
        backend,
        StringsConfig::default(),
        Logger::new(),
    )
}

/// Wait for the next background result and handle it along with its follow-ups
pub async fn settle_next(console: &mut Console) {
    let action = tokio::time::timeout(Duration::from_secs(2), console.next_background_action())
        .await
        .expect("background action timed out")
        .expect("action channel closed");
    handle_all(console, action);
}

/// Handle an action and every follow-up it returns
pub fn handle_all(console: &mut Console, action: Action) {
    let mut next = console.handle_action(action);
    while !matches!(next, Action::None) {
        next = console.handle_action(next);
    }
}
