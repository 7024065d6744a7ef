use anyhow::{Context, Result};
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use typeconsole::components::search::{LookupOutcome, SearchQueue};
use typeconsole::config::Config;
use typeconsole::logger::Logger;
use typeconsole::transport::http::HttpBackend;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.get(1).map(String::as_str) == Some("--generate-config") {
        let path = Config::get_xdg_config_dir()?.join("config.toml");
        return Config::generate_default_config(path);
    }

    let config = Config::load()?;
    let logger = Logger::from_config(&config.logging)?;

    let base_url = config.base_url()?;
    let endpoint = match args.get(1) {
        Some(path) => base_url
            .join(path)
            .with_context(|| format!("Invalid lookup path '{}'", path))?,
        None => {
            eprintln!("Usage: typeconsole <lookup path> | --generate-config");
            return Ok(());
        }
    };

    let backend = Arc::new(HttpBackend::new(base_url).context("Failed to create HTTP client")?);
    let (queue, outcomes) = SearchQueue::spawn(backend);
    logger.log(format!("Lookup: Searching {}", endpoint));

    enable_raw_mode().context("Failed to enable raw mode")?;
    let reports_releases = terminal::supports_keyboard_enhancement().unwrap_or(false);
    if reports_releases {
        execute!(
            io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }

    let result = run_prompt(&queue, outcomes, &endpoint, reports_releases);

    if reports_releases {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    disable_raw_mode().context("Failed to disable raw mode")?;
    println!();

    result
}

fn run_prompt(
    queue: &SearchQueue,
    mut outcomes: tokio::sync::mpsc::UnboundedReceiver<LookupOutcome>,
    endpoint: &url::Url,
    reports_releases: bool,
) -> Result<()> {
    let mut text = String::new();
    redraw(&text, &[])?;

    loop {
        while let Ok(outcome) = outcomes.try_recv() {
            // Only the answer to the current text is worth showing.
            if outcome.search_text != text {
                continue;
            }
            let lines = match outcome.result {
                Ok(result) => result
                    .items
                    .iter()
                    .map(|item| format!("{}  {}", item.id, item.label))
                    .chain(std::iter::once(format!("({} matches)", result.count)))
                    .collect(),
                Err(message) => vec![format!("lookup failed: {}", message)],
            };
            redraw(&text, &lines)?;
        }

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }

        let Event::Key(mut key) = event::read()? else {
            continue;
        };

        if key.kind == KeyEventKind::Press {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => return Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                    text.push(c)
                }
                KeyCode::Backspace => {
                    text.pop();
                }
                _ => {}
            }
            redraw(&text, &[])?;
        }

        // Terminals without release reporting only send presses.
        if !reports_releases && key.kind == KeyEventKind::Press {
            key.kind = KeyEventKind::Release;
        }
        queue.on_key(&key, endpoint, &text, 0);
    }
}

fn redraw(text: &str, lines: &[String]) -> Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "\r\x1b[J> {}", text)?;
    for line in lines {
        write!(stdout, "\r\n  {}", line)?;
    }
    if !lines.is_empty() {
        write!(stdout, "\x1b[{}A\r\x1b[{}C", lines.len(), text.chars().count() + 2)?;
    }
    stdout.flush()?;
    Ok(())
}
