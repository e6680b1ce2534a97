use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::ExplanationConfig;
use crate::explanation::{
    build_prompt, clean_explanation, ExplanationError, TextGenerator, FALLBACK_EMPTY_TEXT,
    FALLBACK_ERROR_TEXT,
};

/// Progress of one debounced request, tagged with the generation that issued it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExplanationEvent {
    /// Quiet period elapsed and the call is in flight
    Loading { generation: u64 },
    Ready { generation: u64, text: String },
    /// Carries the fallback text to display
    Failed { generation: u64, text: String },
    /// Cancelled through its handle after the call had started
    Cancelled { generation: u64 },
}

impl ExplanationEvent {
    pub fn generation(&self) -> u64 {
        match self {
            ExplanationEvent::Loading { generation }
            | ExplanationEvent::Ready { generation, .. }
            | ExplanationEvent::Failed { generation, .. }
            | ExplanationEvent::Cancelled { generation } => *generation,
        }
    }
}

const STAGE_WAITING: u8 = 0;
const STAGE_IN_FLIGHT: u8 = 1;
/// Final event sent, or the request was cancelled
const STAGE_SETTLED: u8 = 2;

/// Lifecycle of one request, shared between its task and its handle. Whoever
/// moves it out of `STAGE_IN_FLIGHT` first owns the final event.
#[derive(Clone)]
struct Stage(Arc<AtomicU8>);

impl Stage {
    fn new() -> Self {
        Stage(Arc::new(AtomicU8::new(STAGE_WAITING)))
    }

    /// Returns false if the request was cancelled before its timer fired.
    fn fire(&self) -> bool {
        self.0
            .compare_exchange(STAGE_WAITING, STAGE_IN_FLIGHT, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Marks a request that never fired as settled so it cannot start.
    fn close(&self) {
        let _ = self.0.compare_exchange(STAGE_WAITING, STAGE_SETTLED, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Claims the right to send the final event. Returns whether the request
    /// was in flight at that moment.
    fn settle(&self) -> bool {
        self.0
            .compare_exchange(STAGE_IN_FLIGHT, STAGE_SETTLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Handle returned by `request_explanation`.
pub struct CancelHandle {
    generation: u64,
    abort: AbortHandle,
    stage: Stage,
    events: mpsc::UnboundedSender<ExplanationEvent>,
}

impl CancelHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stops the request. Before the quiet period ends this guarantees no
    /// network call and no events; afterwards it drops the in-flight call
    /// and reports `Cancelled` so a loading indicator can be cleared. Once
    /// the request has finished this does nothing.
    pub fn cancel(&self) {
        self.abort.abort();
        self.stage.close();
        if self.stage.settle() {
            let _ = self.events.send(ExplanationEvent::Cancelled {
                generation: self.generation,
            });
        }
        debug!(generation = self.generation, "explanation request cancelled");
    }
}

struct Pending {
    generation: u64,
    task: JoinHandle<()>,
}

/// Debounces explanation requests and runs at most one call at a time.
pub struct ExplanationFetcher<G: TextGenerator> {
    client: Arc<G>,
    language: String,
    quiet_period: Duration,
    timeout: Duration,
    next_generation: u64,
    pending: Option<Pending>,
    events: mpsc::UnboundedSender<ExplanationEvent>,
}

impl<G: TextGenerator> ExplanationFetcher<G> {
    pub fn new(
        client: G,
        config: &ExplanationConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ExplanationEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let fetcher = ExplanationFetcher {
            client: Arc::new(client),
            language: config.language.clone(),
            quiet_period: config.debounce,
            timeout: config.timeout,
            next_generation: 0,
            pending: None,
            events,
        };
        (fetcher, rx)
    }

    /// Generation of the most recent request, if any was made.
    pub fn latest_generation(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.generation)
    }

    /// Schedules a fetch for `temperature` once the quiet period passes
    /// without another call. Any earlier request, waiting or in flight, is
    /// aborted. Must be called from within a tokio runtime.
    pub fn request_explanation(&mut self, temperature: f64) -> CancelHandle {
        if let Some(prev) = self.pending.take() {
            if !prev.task.is_finished() {
                debug!(generation = prev.generation, "superseding explanation request");
            }
            prev.task.abort();
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let stage = Stage::new();

        let task = tokio::spawn(run_request(
            Arc::clone(&self.client),
            build_prompt(temperature, &self.language),
            generation,
            temperature,
            self.quiet_period,
            self.timeout,
            stage.clone(),
            self.events.clone(),
        ));

        let handle = CancelHandle {
            generation,
            abort: task.abort_handle(),
            stage,
            events: self.events.clone(),
        };
        self.pending = Some(Pending { generation, task });
        handle
    }

    /// Aborts whatever is pending without scheduling a replacement.
    pub fn cancel_pending(&mut self) {
        if let Some(prev) = self.pending.take() {
            prev.task.abort();
        }
    }
}

impl<G: TextGenerator> Drop for ExplanationFetcher<G> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_request<G: TextGenerator>(
    client: Arc<G>,
    prompt: String,
    generation: u64,
    temperature: f64,
    quiet_period: Duration,
    timeout: Duration,
    stage: Stage,
    events: mpsc::UnboundedSender<ExplanationEvent>,
) {
    tokio::time::sleep(quiet_period).await;

    if !stage.fire() {
        return;
    }
    let _ = events.send(ExplanationEvent::Loading { generation });
    info!(generation, temperature, "requesting explanation");

    let outcome = match tokio::time::timeout(timeout, client.generate(prompt)).await {
        Ok(result) => result,
        Err(_) => Err(ExplanationError::Timeout(timeout)),
    };

    let event = match outcome {
        Ok(raw) => {
            let text = clean_explanation(&raw);
            if text.is_empty() {
                debug!(generation, "empty explanation");
                ExplanationEvent::Ready {
                    generation,
                    text: FALLBACK_EMPTY_TEXT.to_string(),
                }
            } else {
                ExplanationEvent::Ready { generation, text }
            }
        }
        Err(err) => {
            warn!(generation, error = %err, "explanation fetch failed");
            ExplanationEvent::Failed {
                generation,
                text: FALLBACK_ERROR_TEXT.to_string(),
            }
        }
    };
    if stage.settle() {
        let _ = events.send(event);
    }
}
