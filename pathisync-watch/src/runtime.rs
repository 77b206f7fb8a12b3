use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::debounce::Debouncer;
use crate::error::{io_err, WatchError};
use crate::paths::watch_roots;

/// Receives each flushed batch of changed files.
///
/// Runs on a blocking thread; the next batch is not dispatched until this
/// call returns. A returned error is logged and the watcher keeps going.
pub trait BatchHandler: Send + Sync + 'static {
    type Error: std::fmt::Display + Send + 'static;

    fn handle(&self, batch: Vec<PathBuf>) -> Result<(), Self::Error>;
}

impl<F, E> BatchHandler for F
where
    F: Fn(Vec<PathBuf>) -> Result<(), E> + Send + Sync + 'static,
    E: std::fmt::Display + Send + 'static,
{
    type Error = E;

    fn handle(&self, batch: Vec<PathBuf>) -> Result<(), E> {
        self(batch)
    }
}

pub fn start_blocking<H: BatchHandler>(root: &Path, handler: H) -> Result<(), WatchError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(root.to_path_buf(), handler))
}

/// Watch every topic directory under `root` until Ctrl-C.
pub async fn run<H: BatchHandler>(root: PathBuf, handler: H) -> Result<(), WatchError> {
    // Canonicalize so event paths (which arrive as real paths) stay under root.
    let root = fs::canonicalize(&root).map_err(|e| io_err(&root, e))?;
    let roots = watch_roots(&root);
    if roots.is_empty() {
        return Err(WatchError::NothingToWatch { root });
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    for dir in &roots {
        watcher.watch(dir, RecursiveMode::Recursive)?;
        tracing::info!(dir = %dir.display(), "watching");
    }

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received ctrl-c, stopping watcher"),
            Err(err) => {
                tracing::warn!(error = %err, "ctrl-c handler failed; watching until killed");
                std::future::pending::<()>().await;
            }
        }
    };

    let result = drive(event_rx, Arc::new(handler), shutdown).await;
    drop(watcher);
    result
}

/// Event loop: debounce raw events, dispatch flushed batches one at a time.
pub async fn drive<H, S>(
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    handler: Arc<H>,
    shutdown: S,
) -> Result<(), WatchError>
where
    H: BatchHandler,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut debounce = Debouncer::default();

    loop {
        let wake = debounce.deadline();
        tokio::select! {
            _ = &mut shutdown => {
                if !debounce.is_empty() {
                    tracing::debug!(pending = debounce.len(), "dropping unflushed changes");
                }
                break;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    return Err(WatchError::ChannelClosed("watcher events"));
                };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }
                let now = Instant::now();
                for path in event.paths {
                    debounce.record(path, now);
                }
            }
            _ = sleep_until(wake.unwrap_or_else(Instant::now)), if wake.is_some() => {
                let batch = debounce.flush_due(Instant::now());
                dispatch(&handler, batch).await?;
            }
        }
    }

    Ok(())
}

async fn dispatch<H: BatchHandler>(handler: &Arc<H>, batch: Vec<PathBuf>) -> Result<(), WatchError> {
    // Directories and files deleted before the window closed have nothing to sync.
    let batch: Vec<PathBuf> = batch.into_iter().filter(|path| path.is_file()).collect();
    if batch.is_empty() {
        return Ok(());
    }

    let count = batch.len();
    let started = Instant::now();
    let handler = Arc::clone(handler);
    let result = tokio::task::spawn_blocking(move || handler.handle(batch))
        .await
        .map_err(|err| WatchError::Task(format!("batch handler join error: {err}")))?;

    match result {
        Ok(()) => tracing::info!(
            paths = count,
            duration_ms = started.elapsed().as_millis() as u64,
            "watch-triggered sync completed",
        ),
        Err(err) => tracing::error!(error = %err, "watch-triggered sync failed"),
    }
    Ok(())
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    type Batches = Arc<Mutex<Vec<Vec<PathBuf>>>>;

    fn touch(dir: &Path, relative: &str) -> PathBuf {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{}").unwrap();
        path
    }

    fn modified(path: &Path) -> notify::Result<Event> {
        Ok(Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path.to_path_buf()))
    }

    fn recorder(batches: &Batches, fail_first: bool) -> impl BatchHandler<Error = String> {
        let batches = Arc::clone(batches);
        move |batch: Vec<PathBuf>| {
            let mut seen = batches.lock().unwrap();
            seen.push(batch);
            if fail_first && seen.len() == 1 {
                return Err("remote rejected the push".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn only_creates_and_modifications_matter() {
        assert!(is_relevant_event_kind(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant_event_kind(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_relevant_event_kind(&EventKind::Remove(RemoveKind::File)));
        assert!(!is_relevant_event_kind(&EventKind::Any));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn burst_is_flushed_as_one_ordered_batch() {
        let tmp = TempDir::new().unwrap();
        let member = touch(tmp.path(), "resources/site/index.html");
        let descriptor = touch(tmp.path(), "resources/site/_collection.json");
        let gone = tmp.path().join("flows/deleted.json");

        let batches: Batches = Arc::default();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(drive(
            event_rx,
            Arc::new(recorder(&batches, false)),
            async move {
                let _ = stop_rx.await;
            },
        ));

        event_tx.send(modified(&member)).unwrap();
        event_tx.send(modified(&descriptor)).unwrap();
        event_tx.send(modified(&member)).unwrap();
        event_tx.send(modified(&gone)).unwrap();
        event_tx
            .send(Ok(Event::new(EventKind::Remove(RemoveKind::File)).add_path(member.clone())))
            .unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        stop_tx.send(()).unwrap();
        task.await.unwrap().unwrap();

        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 1, "a burst of saves should trigger one sync");
        assert_eq!(batches[0], vec![descriptor, member]);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn handler_failure_does_not_stop_the_watcher() {
        let tmp = TempDir::new().unwrap();
        let flow = touch(tmp.path(), "flows/checkout.json");
        let trigger = touch(tmp.path(), "triggers/nightly.json");

        let batches: Batches = Arc::default();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(drive(
            event_rx,
            Arc::new(recorder(&batches, true)),
            async move {
                let _ = stop_rx.await;
            },
        ));

        event_tx.send(modified(&flow)).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        event_tx.send(modified(&trigger)).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        stop_tx.send(()).unwrap();
        task.await.unwrap().unwrap();

        let batches = batches.lock().unwrap();
        assert_eq!(*batches, vec![vec![flow], vec![trigger]]);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn closed_event_channel_is_an_error() {
        let batches: Batches = Arc::default();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        drop(event_tx);

        let err = drive(event_rx, Arc::new(recorder(&batches, false)), std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, WatchError::ChannelClosed(_)));
    }

    #[tokio::test]
    async fn run_refuses_a_root_without_topics() {
        let tmp = TempDir::new().unwrap();
        let batches: Batches = Arc::default();
        let err = run(tmp.path().to_path_buf(), recorder(&batches, false))
            .await
            .unwrap_err();
        assert!(matches!(err, WatchError::NothingToWatch { .. }));
    }
}
