//! Accumulate-then-flush state for bursts of filesystem events.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

use crate::paths::{is_descriptor, is_scratch, DEBOUNCE_WINDOW};

/// Pending changed paths plus a single deadline that every new event pushes
/// back. A batch is released only after a full quiet window.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: BTreeSet<PathBuf>,
    deadline: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW)
    }
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: BTreeSet::new(),
            deadline: None,
        }
    }

    /// Note a changed path and restart the quiet window.
    pub fn record(&mut self, path: PathBuf, now: Instant) {
        if is_scratch(&path) {
            return;
        }
        self.pending.insert(path);
        self.deadline = Some(now + self.window);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Release the pending batch if the window has elapsed, else nothing.
    pub fn flush_due(&mut self, now: Instant) -> Vec<PathBuf> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                order_batch(std::mem::take(&mut self.pending))
            }
            _ => Vec::new(),
        }
    }
}

/// Collection descriptors first so membership is settled before member
/// files are looked at; each group keeps path order.
pub fn order_batch(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let (mut descriptors, mut others): (Vec<_>, Vec<_>) =
        paths.into_iter().partition(|p| is_descriptor(p));
    descriptors.sort();
    others.sort();
    descriptors.extend(others);
    descriptors
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn every_event_pushes_the_deadline_back() {
        let mut debounce = Debouncer::new(Duration::from_millis(100));
        debounce.record(p("/p/flows/a.json"), Instant::now());
        advance(Duration::from_millis(80)).await;
        debounce.record(p("/p/flows/b.json"), Instant::now());
        advance(Duration::from_millis(80)).await;

        assert!(debounce.flush_due(Instant::now()).is_empty());
        assert_eq!(debounce.len(), 2);

        advance(Duration::from_millis(20)).await;
        let batch = debounce.flush_due(Instant::now());
        assert_eq!(batch, vec![p("/p/flows/a.json"), p("/p/flows/b.json")]);
        assert!(debounce.is_empty());
        assert_eq!(debounce.deadline(), None);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn repeated_saves_of_one_file_collapse() {
        let mut debounce = Debouncer::default();
        for _ in 0..5 {
            debounce.record(p("/p/triggers/nightly.json"), Instant::now());
            advance(Duration::from_millis(10)).await;
        }
        advance(DEBOUNCE_WINDOW).await;
        assert_eq!(
            debounce.flush_due(Instant::now()),
            vec![p("/p/triggers/nightly.json")]
        );
    }

    #[test]
    fn scratch_files_are_not_recorded() {
        let mut debounce = Debouncer::default();
        debounce.record(p("/p/flows/a.json.pathisync.tmp"), Instant::now());
        assert!(debounce.is_empty());
        assert_eq!(debounce.deadline(), None);
    }

    #[test]
    fn descriptors_lead_the_batch() {
        let batch = order_batch([
            p("/p/resources/site/index.html"),
            p("/p/flows/a.json"),
            p("/p/resources/site/_collection.json"),
            p("/p/resources/blog/_collection.json"),
        ]);
        assert_eq!(
            batch,
            vec![
                p("/p/resources/blog/_collection.json"),
                p("/p/resources/site/_collection.json"),
                p("/p/flows/a.json"),
                p("/p/resources/site/index.html"),
            ]
        );
    }
}
