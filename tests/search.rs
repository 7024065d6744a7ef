mod common;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use typeconsole::components::search::{lookup_url, LookupOutcome, LookupRequest, SearchQueue};
use url::Url;

fn endpoint() -> Url {
    Url::parse("http://localhost:8080/en/product?view=json").unwrap()
}

fn request(text: &str) -> LookupRequest {
    LookupRequest {
        url: lookup_url(&endpoint(), text, 0),
        search_text: text.to_string(),
    }
}

async fn collect(rx: &mut tokio::sync::mpsc::UnboundedReceiver<LookupOutcome>, count: usize) -> Vec<LookupOutcome> {
    let mut outcomes = Vec::with_capacity(count);
    for _ in 0..count {
        let outcome = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("lookup timed out")
            .expect("queue closed");
        outcomes.push(outcome);
    }
    outcomes
}

#[tokio::test]
async fn test_results_arrive_in_request_order() {
    let backend = Arc::new(common::MockBackend::new());
    let (queue, mut rx) = SearchQueue::spawn(backend.clone());

    for text in ["a", "ab", "abc"] {
        assert!(queue.enqueue(request(text)));
    }

    let outcomes = collect(&mut rx, 3).await;
    let texts: Vec<&str> = outcomes.iter().map(|o| o.search_text.as_str()).collect();
    assert_eq!(texts, vec!["a", "ab", "abc"]);
    assert_eq!(outcomes[2].result.as_ref().unwrap().items[0].label, "abc");
}

#[tokio::test]
async fn test_one_lookup_in_flight_at_a_time() {
    let backend = Arc::new(common::MockBackend::new());
    let (queue, mut rx) = SearchQueue::spawn(backend.clone());

    for text in ["a", "ab", "abc", "abcd"] {
        queue.enqueue(request(text));
    }
    collect(&mut rx, 4).await;

    assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 1);
    let searched: Vec<String> = backend
        .lookup_urls
        .lock()
        .unwrap()
        .iter()
        .map(|url| url.query().unwrap_or_default().to_string())
        .collect();
    assert_eq!(searched[0], "view=json&search=a&offset=0");
    assert_eq!(searched[3], "view=json&search=abcd&offset=0");
}

#[tokio::test]
async fn test_failures_are_delivered_in_order() {
    let backend = Arc::new(common::MockBackend::new());
    *backend.failing_search.lock().unwrap() = Some("ab".to_string());
    let (queue, mut rx) = SearchQueue::spawn(backend.clone());

    for text in ["a", "ab", "x"] {
        queue.enqueue(request(text));
    }

    let outcomes = collect(&mut rx, 3).await;
    assert!(outcomes[0].result.is_ok());
    assert_eq!(outcomes[1].result, Err("lookup of 'ab' failed".to_string()));
    assert!(outcomes[2].result.is_ok());
}

#[tokio::test]
async fn test_only_text_changing_releases_enqueue() {
    let backend = Arc::new(common::MockBackend::new());
    let (queue, mut rx) = SearchQueue::spawn(backend.clone());

    let press = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::NONE);
    let arrow = KeyEvent {
        code: KeyCode::Down,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Release,
        state: KeyEventState::NONE,
    };
    let release = KeyEvent {
        code: KeyCode::Char('p'),
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Release,
        state: KeyEventState::NONE,
    };

    assert!(!queue.on_key(&press, &endpoint(), "p", 0));
    assert!(!queue.on_key(&arrow, &endpoint(), "p", 0));
    assert!(queue.on_key(&release, &endpoint(), "p", 10));

    let outcome = collect(&mut rx, 1).await.remove(0);
    assert_eq!(outcome.search_text, "p");
    assert_eq!(outcome.url.query(), Some("view=json&search=p&offset=10"));
    assert_eq!(backend.lookup_urls.lock().unwrap().len(), 1);
}
