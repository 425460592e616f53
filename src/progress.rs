//! Observability hooks for long-running queries.
//!
//! Listeners are purely observational: they never affect query results, and
//! the engine calls them from the traversal thread only. Counter updates must
//! be cheap because they sit inside descent loops.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Progress callback consumed by the query engine.
pub trait ProgressListener: Sync {
    /// A query is starting with an expected number of work units.
    fn begin(&self, total_units: usize) {
        let _ = total_units;
    }

    /// Some units of work finished.
    fn worked(&self, units: usize, message: &str) {
        let _ = (units, message);
    }

    /// The query finished.
    fn done(&self) {}

    /// Index nodes visited during descent.
    fn add_visited_index_nodes(&self, count: usize) {
        let _ = count;
    }

    /// Candidate geometries that reached the exact-evaluation stage.
    fn add_candidate_geometries(&self, count: usize) {
        let _ = count;
    }
}

/// The default listener: ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressListener for NoProgress {}

struct LogProgressState {
    total_units: usize,
    worked: usize,
    started: Option<Instant>,
    last_log: Option<Instant>,
}

/// Listener that reports through the `log` facade, throttled so it never
/// emits more than one line per configured interval.
pub struct LogProgress {
    name: String,
    interval: Duration,
    state: Mutex<LogProgressState>,
    visited_index_nodes: AtomicUsize,
    candidate_geometries: AtomicUsize,
}

impl LogProgress {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interval: Duration::from_secs(1),
            state: Mutex::new(LogProgressState {
                total_units: 0,
                worked: 0,
                started: None,
                last_log: None,
            }),
            visited_index_nodes: AtomicUsize::new(0),
            candidate_geometries: AtomicUsize::new(0),
        }
    }

    /// Override the minimum time between log lines.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Total index nodes visited so far.
    pub fn visited_index_nodes(&self) -> usize {
        self.visited_index_nodes.load(Ordering::Relaxed)
    }

    /// Total candidate geometries seen so far.
    pub fn candidate_geometries(&self) -> usize {
        self.candidate_geometries.load(Ordering::Relaxed)
    }

    fn log_throttled(&self, state: &mut LogProgressState, line: &str) {
        let now = Instant::now();
        let due = state
            .last_log
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if due {
            let elapsed = state
                .started
                .map(|s| now.duration_since(s))
                .unwrap_or_default();
            if state.total_units > 0 {
                let percent = 100.0 * state.worked as f64 / state.total_units as f64;
                log::info!(
                    "{}: {:.2}% ({}/{}) elapsed {} index nodes {} candidates {} - {}",
                    self.name,
                    percent,
                    state.worked,
                    state.total_units,
                    format_duration(elapsed),
                    self.visited_index_nodes(),
                    self.candidate_geometries(),
                    line,
                );
            } else {
                log::info!("{}: {} - {}", self.name, format_duration(elapsed), line);
            }
            state.last_log = Some(now);
        }
    }
}

impl ProgressListener for LogProgress {
    fn begin(&self, total_units: usize) {
        let mut state = self.state.lock();
        state.total_units = total_units;
        state.worked = 0;
        state.started = Some(Instant::now());
        state.last_log = None;
        log::info!("Starting {}", self.name);
    }

    fn worked(&self, units: usize, message: &str) {
        let mut state = self.state.lock();
        state.worked += units;
        self.log_throttled(&mut state, message);
    }

    fn done(&self) {
        let mut state = self.state.lock();
        state.worked = state.total_units;
        // Completion always logs, regardless of throttling.
        state.last_log = None;
        self.log_throttled(&mut state, "done");
    }

    fn add_visited_index_nodes(&self, count: usize) {
        self.visited_index_nodes.fetch_add(count, Ordering::Relaxed);
    }

    fn add_candidate_geometries(&self, count: usize) {
        self.candidate_geometries.fetch_add(count, Ordering::Relaxed);
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        duration.subsec_millis(),
    )
}
