//! Serialized live-lookup queue.
//!
//! Key releases in a lookup input enqueue a request; one background task
//! works through the queue strictly one request at a time, in order, and
//! delivers every outcome. Nothing is dropped or canceled: consumers compare
//! [`LookupOutcome::search_text`] with the current input to skip stale results.

use crate::constants::{PARAM_OFFSET, PARAM_SEARCH};
use crate::transport::{ConsoleBackend, LookupResult};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

/// A queued lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub url: Url,
    pub search_text: String,
}

/// The answer to one lookup, failed or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOutcome {
    pub search_text: String,
    pub url: Url,
    pub result: Result<LookupResult, String>,
}

/// Lookup address for `text` starting at result `offset`
pub fn lookup_url(endpoint: &Url, text: &str, offset: u64) -> Url {
    let mut url = endpoint.clone();
    let retained: Vec<(String, String)> = endpoint
        .query_pairs()
        .filter(|(name, _)| name != PARAM_SEARCH && name != PARAM_OFFSET)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(PARAM_SEARCH, text)
        .append_pair(PARAM_OFFSET, &offset.to_string());
    url
}

/// Whether a key event should trigger a lookup.
///
/// Only releases count. Navigation, modifier, confirmation and dead keys
/// never change the input text, and neither do control/alt chords.
pub fn is_lookup_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Release {
        return false;
    }

    match key.code {
        KeyCode::Char(_) => !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT),
        KeyCode::Backspace | KeyCode::Delete => true,
        _ => false,
    }
}

pub struct SearchQueue {
    sender: mpsc::UnboundedSender<LookupRequest>,
    worker: JoinHandle<()>,
}

impl SearchQueue {
    /// Start the worker task; outcomes arrive on the returned receiver
    pub fn spawn(backend: Arc<dyn ConsoleBackend>) -> (Self, mpsc::UnboundedReceiver<LookupOutcome>) {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<LookupRequest>();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let worker = tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                log::debug!("[search] GET {}", request.url);
                let result = backend.lookup(&request.url).await.map_err(|e| {
                    log::warn!("[search] Lookup failed: {}", e);
                    e.user_message()
                });

                let outcome = LookupOutcome {
                    search_text: request.search_text,
                    url: request.url,
                    result,
                };
                if outcome_tx.send(outcome).is_err() {
                    break;
                }
            }
            log::debug!("[search] Queue closed");
        });

        (Self { sender: request_tx, worker }, outcome_rx)
    }

    /// Queue a lookup; returns false once the worker has stopped
    pub fn enqueue(&self, request: LookupRequest) -> bool {
        self.sender.send(request).is_ok()
    }

    /// Feed a key event from a lookup input holding `text`
    pub fn on_key(&self, key: &KeyEvent, endpoint: &Url, text: &str, offset: u64) -> bool {
        if !is_lookup_key(key) {
            return false;
        }

        self.enqueue(LookupRequest {
            url: lookup_url(endpoint, text, offset),
            search_text: text.to_string(),
        })
    }
}

impl Drop for SearchQueue {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn release(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_lookup_keys() {
        assert!(is_lookup_key(&release(KeyCode::Char('a'), KeyModifiers::NONE)));
        assert!(is_lookup_key(&release(KeyCode::Char('A'), KeyModifiers::SHIFT)));
        assert!(is_lookup_key(&release(KeyCode::Backspace, KeyModifiers::NONE)));

        assert!(!is_lookup_key(&release(KeyCode::Enter, KeyModifiers::NONE)));
        assert!(!is_lookup_key(&release(KeyCode::Left, KeyModifiers::NONE)));
        assert!(!is_lookup_key(&release(KeyCode::Tab, KeyModifiers::NONE)));
        assert!(!is_lookup_key(&release(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(!is_lookup_key(&release(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn test_press_does_not_trigger_lookup() {
        let press = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        assert!(!is_lookup_key(&press));
    }

    #[test]
    fn test_lookup_url_replaces_search_parameters() {
        let endpoint = Url::parse("http://localhost/en/product?view=json&search=old").unwrap();
        let url = lookup_url(&endpoint, "ab c", 20);
        assert_eq!(url.query(), Some("view=json&search=ab+c&offset=20"));
    }
}
