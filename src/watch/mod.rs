//! Watch coordinator.
//!
//! Translates filesystem change notifications into rebuild calls on a
//! shared [`Builder`]. The notify watcher runs on its own thread and is
//! bridged into a tokio channel; the session loop debounces raw events
//! into batches, applies a pure filter (only in-place content updates to
//! the two watched inputs count), and awaits each rebuild before touching
//! the next batch — rebuilds never overlap.
//!
//! Error containment: rebuild failures that look like a read racing a
//! concurrent write (editor save in progress) are retried once after a
//! short delay and then swallowed; anything else, a broken watcher
//! subscription included, tears the session down (unwatch, close the
//! builder, report) without unwinding into the event loop, and the exit
//! reason is surfaced so the process can end non-zero.

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

use crate::browser::{BrowserRenderer, DocumentEngine};
use crate::builder::{Builder, RenderRequest};
use crate::config::RenderConfig;
use crate::error::BuildError;
use crate::logger;
use crate::utils::path::{absolutize, normalize};
use crate::{debug, log};

/// Collect a batch for this long after the first raw event arrives.
const DEBOUNCE_MS: u64 = 150;
/// Wait this long before retrying a transient read failure.
const TRANSIENT_RETRY_MS: u64 = 150;
/// Buffered raw events between the watcher thread and the session loop.
const EVENT_BUFFER: usize = 64;

/// An active watch session: a live builder plus a filesystem subscription.
///
/// Dropped resources on every exit path: the loop closes the builder when
/// it stops for any reason (shutdown signal, watcher gone, fatal rebuild
/// error), and [`WatchSession::close`] is the external cleanup handle.
pub struct WatchSession<E: DocumentEngine = BrowserRenderer> {
    builder: Arc<Mutex<Builder<E>>>,
    shutdown: Option<oneshot::Sender<()>>,
    done: oneshot::Receiver<SessionEnd>,
    task: JoinHandle<()>,
}

/// Why the session loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Cleanup was requested, or the event source went away.
    Stopped,
    /// An unrecoverable rebuild error tore the session down.
    Failed,
}

impl<E: DocumentEngine> WatchSession<E> {
    /// Resolves once the session has torn itself down (for any reason).
    ///
    /// Lets the caller exit non-zero on an unrecoverable rebuild error
    /// instead of idling until a signal arrives.
    pub async fn ended(&mut self) -> SessionEnd {
        (&mut self.done).await.unwrap_or(SessionEnd::Stopped)
    }

    /// Stop watching and release everything.
    ///
    /// Waits for an in-flight rebuild to settle before the builder closes.
    /// Safe to call after the session already tore itself down on an
    /// unrecoverable error.
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            // Send fails iff the loop already exited; either way it is done.
            let _ = tx.send(());
        }
        let _ = self.task.await;
        // The loop closes the builder on its way out; this is the backstop
        // for the (unreachable in practice) case of an aborted task.
        self.builder.lock().await.close().await;
    }
}

/// Build once, then rebuild whenever either input file changes in place.
///
/// Both watch targets must exist up front; that is checked before any
/// rendering resource is allocated, so a typo'd path never costs a browser
/// launch. Setup failures unwind fully: whatever was constructed is closed
/// before the error is returned.
pub async fn develop(
    request: &RenderRequest,
    root: &Path,
    config: &RenderConfig,
) -> Result<WatchSession, BuildError> {
    let data_path = absolutize(&request.data, root)?;
    let template_path = absolutize(&request.template, root)?;
    for target in [&template_path, &data_path] {
        if !target.is_file() {
            return Err(BuildError::WatchTargetMissing(target.clone()));
        }
    }

    let builder = Builder::open(root, config).await?;
    start_session(builder, request.clone(), root, [data_path, template_path]).await
}

/// Session setup after the builder exists: eager build, then subscribe.
pub(crate) async fn start_session<E: DocumentEngine>(
    mut builder: Builder<E>,
    request: RenderRequest,
    root: &Path,
    targets: [PathBuf; 2],
) -> Result<WatchSession<E>, BuildError> {
    if let Err(e) = builder.build(&request).await {
        builder.close().await;
        return Err(e);
    }

    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let watcher = match subscribe(root, event_tx) {
        Ok(watcher) => watcher,
        Err(e) => {
            builder.close().await;
            return Err(e.into());
        }
    };

    log!("watch"; "watching {} and {}",
        request.template.display(), request.data.display());
    Ok(spawn_session(builder, request, targets, Some(watcher), event_rx))
}

/// Subscribe at `root` and bridge notify's thread-side callback into an
/// async channel (notify has no async delivery of its own). Watcher errors
/// travel over the same channel; the session loop treats them as fatal.
fn subscribe(
    root: &Path,
    tx: mpsc::Sender<notify::Result<Event>>,
) -> notify::Result<RecommendedWatcher> {
    let (raw_tx, raw_rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |result| {
        let _ = raw_tx.send(result);
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;

    std::thread::spawn(move || {
        while let Ok(result) = raw_rx.recv() {
            if tx.blocking_send(result).is_err() {
                break; // session loop gone
            }
        }
    });

    Ok(watcher)
}

/// Wire up the session loop. The watcher is `None` only in tests that feed
/// synthetic events through the channel directly.
pub(crate) fn spawn_session<E: DocumentEngine>(
    builder: Builder<E>,
    request: RenderRequest,
    targets: [PathBuf; 2],
    watcher: Option<RecommendedWatcher>,
    events: mpsc::Receiver<notify::Result<Event>>,
) -> WatchSession<E> {
    let builder = Arc::new(Mutex::new(builder));
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let (done_tx, done_rx) = oneshot::channel();
    let task = tokio::spawn(run_session(
        builder.clone(),
        request,
        targets,
        watcher,
        events,
        shutdown_rx,
        done_tx,
    ));
    WatchSession {
        builder,
        shutdown: Some(shutdown_tx),
        done: done_rx,
        task,
    }
}

async fn run_session<E: DocumentEngine>(
    builder: Arc<Mutex<Builder<E>>>,
    request: RenderRequest,
    targets: [PathBuf; 2],
    watcher: Option<RecommendedWatcher>,
    mut events: mpsc::Receiver<notify::Result<Event>>,
    mut shutdown: oneshot::Receiver<()>,
    done: oneshot::Sender<SessionEnd>,
) {
    // The subscription lives exactly as long as this loop.
    let _watcher = watcher;
    let mut end = SessionEnd::Stopped;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            first = events.recv() => {
                let Some(first) = first else { break };

                // Let the burst of events from one save settle, then drain.
                sleep(Duration::from_millis(DEBOUNCE_MS)).await;
                let mut batch = Vec::new();
                let mut broken = match first {
                    Ok(event) => {
                        batch.push(event);
                        None
                    }
                    Err(e) => Some(e),
                };
                while broken.is_none() {
                    match events.try_recv() {
                        Ok(Ok(event)) => batch.push(event),
                        Ok(Err(e)) => broken = Some(e),
                        Err(_) => break,
                    }
                }

                // A broken subscription means rebuilds can no longer be
                // trusted to fire; tear down instead of watching nothing.
                if let Some(e) = broken {
                    logger::status_error(
                        "filesystem watch failed, stopping",
                        &describe(&BuildError::Watch(e)),
                    );
                    end = SessionEnd::Failed;
                    break;
                }

                if !wants_rebuild(&batch, &targets) {
                    debug!("watch"; "ignoring {} event(s) outside watch targets", batch.len());
                    continue;
                }

                if rebuild(&builder, &request).await.is_err() {
                    end = SessionEnd::Failed;
                    break;
                }
            }
        }
    }

    builder.lock().await.close().await;
    // Nobody listening means cleanup was driven from the other side.
    let _ = done.send(end);
}

/// One rebuild, with the transient-read retry. `Err(())` ends the session.
async fn rebuild<E: DocumentEngine>(
    builder: &Arc<Mutex<Builder<E>>>,
    request: &RenderRequest,
) -> Result<(), ()> {
    let err = match builder.lock().await.build(request).await {
        Ok(()) => {
            logger::status_success(&format!("rebuilt {}", request.output.display()));
            return Ok(());
        }
        Err(e) => e,
    };

    if !err.is_transient_read() {
        logger::status_error("rebuild failed, stopping watch", &describe(&err));
        return Err(());
    }

    // The change notification likely raced the writer; give it a moment.
    debug!("watch"; "transient read failure, retrying: {}", err);
    sleep(Duration::from_millis(TRANSIENT_RETRY_MS)).await;

    match builder.lock().await.build(request).await {
        Ok(()) => {
            logger::status_success(&format!("rebuilt {}", request.output.display()));
            Ok(())
        }
        Err(e) if e.is_transient_read() => {
            logger::status_warning(&format!("skipped rebuild: {}", describe(&e)));
            Ok(())
        }
        Err(e) => {
            logger::status_error("rebuild failed, stopping watch", &describe(&e));
            Err(())
        }
    }
}

/// Pure batch filter: does any event describe an in-place content update
/// to one of the watched files? Creation and deletion of the watched files
/// do not count, and neither do metadata-only modifications.
fn wants_rebuild(batch: &[Event], targets: &[PathBuf; 2]) -> bool {
    batch.iter().any(|event| {
        is_content_update(&event.kind)
            && event
                .paths
                .iter()
                .any(|path| targets.iter().any(|target| *target == normalize(path)))
    })
}

fn is_content_update(kind: &EventKind) -> bool {
    match kind {
        // mtime/atime/chmod noise must not trigger rebuild loops
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Error message with its source chain flattened onto one line per cause.
fn describe(err: &BuildError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
    }
    message
}
