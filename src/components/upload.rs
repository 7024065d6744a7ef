//! Upload progress of large-payload submissions.
//!
//! Throughput is a cumulative average: bytes sent so far divided by the time
//! since the request started.

use crate::transport::TransferSample;
use crate::utils::bytes::progress_text;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSession {
    pub started_at: Instant,
    pub bytes_loaded: u64,
    pub bytes_total: u64,
}

/// One refresh of the progress dialog
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub loaded: u64,
    pub total: u64,
    pub bytes_per_second: f64,
    pub percent: f64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct UploadProgressTracker {
    session: UploadSession,
    locale: String,
}

impl UploadProgressTracker {
    /// Start tracking a request sent now
    pub fn new(locale: impl Into<String>) -> Self {
        Self::starting_at(locale, Instant::now())
    }

    pub fn starting_at(locale: impl Into<String>, started_at: Instant) -> Self {
        Self {
            session: UploadSession {
                started_at,
                bytes_loaded: 0,
                bytes_total: 0,
            },
            locale: locale.into(),
        }
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn sample(&mut self, sample: TransferSample) -> ProgressReport {
        self.sample_at(sample, Instant::now())
    }

    pub fn sample_at(&mut self, sample: TransferSample, now: Instant) -> ProgressReport {
        self.session.bytes_loaded = sample.loaded;
        self.session.bytes_total = sample.total;

        let elapsed = now.saturating_duration_since(self.session.started_at).as_secs_f64();
        let bytes_per_second = if elapsed > 0.0 {
            sample.loaded as f64 / elapsed
        } else {
            0.0
        };

        let percent = if sample.total == 0 {
            0.0
        } else {
            sample.loaded as f64 * 100.0 / sample.total as f64
        };

        ProgressReport {
            loaded: sample.loaded,
            total: sample.total,
            bytes_per_second,
            percent,
            text: progress_text(sample.loaded, sample.total, bytes_per_second, &self.locale),
        }
    }
}
