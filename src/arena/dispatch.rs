//! Fan-out dispatcher: N concurrent provider streams merged into one
//! outbound event stream.

use super::branch::Branch;
use super::event::StreamEvent;
use crate::provider::{ChatMessage, ChatRequest, ProviderEvent, ProviderRegistry};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outbound channel depth. Branch tasks block here briefly if the client
/// reads slowly; the channel closing is how client disconnect reaches them.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One model's answer from an earlier round, fed back as context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResponse {
    pub model: String,
    pub content: String,
}

/// A completed earlier round of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousRound {
    pub prompt: String,
    pub responses: Vec<RoundResponse>,
}

/// Everything one dispatch needs, already validated by the API layer.
#[derive(Debug, Clone)]
pub struct DispatchSpec {
    pub prompt: String,
    pub models: Vec<String>,
    pub previous_rounds: Vec<PreviousRound>,
    pub round_number: u32,
}

impl DispatchSpec {
    pub fn single(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            models: vec![model.into()],
            previous_rounds: Vec::new(),
            round_number: 1,
        }
    }
}

/// Handle returned by [`Dispatcher::dispatch`].
///
/// `events` is the merged outbound stream; `finished` resolves with the
/// frozen branches once every one of them reached a terminal status, for
/// fire-and-forget persistence.
pub struct DispatchHandle {
    pub events: ReceiverStream<StreamEvent>,
    pub finished: oneshot::Receiver<Vec<Branch>>,
}

/// Owns the fan-out: one task per model, single merged output stream.
///
/// Guarantees exactly one terminal event (`model_complete` or `error`) per
/// requested model, followed by exactly one `all_complete`. No retries; a
/// failed branch never blocks its siblings.
#[derive(Clone)]
pub struct Dispatcher {
    providers: Arc<ProviderRegistry>,
    /// Optional per-branch deadline. None means a stalled upstream stalls
    /// only its own branch, delaying `all_complete`.
    branch_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(providers: Arc<ProviderRegistry>, branch_timeout: Option<Duration>) -> Self {
        Self {
            providers,
            branch_timeout,
        }
    }

    /// Start all branches concurrently and return the merged stream.
    ///
    /// Interleaving across branches is nondeterministic; per-branch chunk
    /// order is preserved by the single-writer-per-branch discipline. The
    /// cancel token aborts every in-flight upstream call at once (fired by
    /// the handler when the client disconnects).
    pub fn dispatch(&self, spec: DispatchSpec, cancel: CancellationToken) -> DispatchHandle {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = oneshot::channel();

        let providers = Arc::clone(&self.providers);
        let branch_timeout = self.branch_timeout;

        tokio::spawn(async move {
            let started = Instant::now();
            info!(
                models = ?spec.models,
                round = spec.round_number,
                "Starting fan-out dispatch"
            );

            let mut handles = Vec::with_capacity(spec.models.len());
            for model in spec.models.clone() {
                let messages = build_messages(&spec, &model);
                let request = ChatRequest::completion(model.clone(), messages);
                handles.push(tokio::spawn(run_branch(
                    Arc::clone(&providers),
                    model,
                    request,
                    tx.clone(),
                    started,
                    branch_timeout,
                    cancel.child_token(),
                )));
            }

            let mut branches = Vec::with_capacity(handles.len());
            for handle in handles {
                match handle.await {
                    Ok(branch) => branches.push(branch),
                    Err(e) => warn!(error = %e, "Branch task panicked"),
                }
            }

            // Every branch is terminal; close out the stream.
            let _ = tx.send(StreamEvent::AllComplete).await;
            debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Dispatch complete"
            );

            let _ = done_tx.send(branches);
        });

        DispatchHandle {
            events: ReceiverStream::new(rx),
            finished: done_rx,
        }
    }
}

/// Drive one branch to a terminal event. Always returns the frozen branch.
async fn run_branch(
    providers: Arc<ProviderRegistry>,
    model: String,
    request: ChatRequest,
    tx: mpsc::Sender<StreamEvent>,
    started: Instant,
    branch_timeout: Option<Duration>,
    cancel: CancellationToken,
) -> Branch {
    let mut branch = Branch::new(&model);

    let result = match branch_timeout {
        Some(deadline) => {
            match tokio::time::timeout(
                deadline,
                drive_branch(&providers, &mut branch, request, &tx, started, &cancel),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(format!(
                    "Branch timed out after {}s",
                    deadline.as_secs()
                )),
            }
        }
        None => drive_branch(&providers, &mut branch, request, &tx, started, &cancel).await,
    };

    let sanitized_model = crate::metrics::sanitize_label(&model);
    match result {
        Ok(()) => {
            branch.complete(started);
            let latency = branch.latency();
            if let Some(ttft_ms) = latency.ttft_ms {
                metrics::histogram!("promptpit_branch_ttft_seconds",
                    "model" => sanitized_model.clone()
                )
                .record(ttft_ms as f64 / 1000.0);
            }
            metrics::histogram!("promptpit_branch_duration_seconds",
                "model" => sanitized_model
            )
            .record(latency.total_ms as f64 / 1000.0);

            let _ = tx
                .send(StreamEvent::ModelComplete {
                    model: branch.model.clone(),
                    latency,
                })
                .await;
        }
        Err(error) => {
            warn!(model = %model, error = %error, "Branch failed");
            metrics::counter!("promptpit_branch_errors_total",
                "model" => sanitized_model
            )
            .increment(1);

            branch.fail(&error, started);
            let _ = tx
                .send(StreamEvent::Error {
                    model: branch.model.clone(),
                    error,
                })
                .await;
        }
    }

    branch
}

/// Stream the upstream response into the branch, relaying chunks.
///
/// Ok means the upstream finished normally; Err carries the surfaced error
/// message. Terminal events are emitted by the caller so the timeout path
/// shares them.
async fn drive_branch(
    providers: &ProviderRegistry,
    branch: &mut Branch,
    request: ChatRequest,
    tx: &mpsc::Sender<StreamEvent>,
    started: Instant,
    cancel: &CancellationToken,
) -> Result<(), String> {
    let client = providers
        .client_for(&branch.model)
        .ok_or_else(|| format!("No provider configured for model '{}'", branch.model))?;

    let mut stream = client
        .stream_chat(request)
        .await
        .map_err(|e| e.to_string())?;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Err("Request cancelled".to_string()),
            next = stream.next() => match next {
                None | Some(Ok(ProviderEvent::Done)) => return Ok(()),
                Some(Ok(ProviderEvent::Content(content))) => {
                    branch.record_chunk(&content, started);
                    let event = StreamEvent::Chunk {
                        model: branch.model.clone(),
                        content,
                    };
                    if tx.send(event).await.is_err() {
                        return Err("Client disconnected".to_string());
                    }
                }
                // Plain completions never request tools; ignore stray calls.
                Some(Ok(ProviderEvent::ToolCall { .. })) => {}
                Some(Err(e)) => return Err(e.to_string()),
            },
        }
    }
}

/// Build the conversation for one model, folding in earlier rounds.
///
/// The model sees its own earlier answer as assistant turns and the other
/// participants' answers inside a user turn, so providers that reject
/// consecutive assistant messages stay happy.
fn build_messages(spec: &DispatchSpec, model: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::new();

    if spec.models.len() > 1 {
        messages.push(ChatMessage::system(format!(
            "You are {} participating in a multi-model debate. \
             Give your strongest, clearest answer. This is round {}.",
            model, spec.round_number
        )));
    }

    for round in &spec.previous_rounds {
        messages.push(ChatMessage::user(round.prompt.clone()));

        if let Some(own) = round.responses.iter().find(|r| r.model == model) {
            messages.push(ChatMessage::assistant(own.content.clone()));
        }

        let others: Vec<String> = round
            .responses
            .iter()
            .filter(|r| r.model != model)
            .map(|r| format!("[{}]: {}", r.model, r.content))
            .collect();
        if !others.is_empty() {
            messages.push(ChatMessage::user(format!(
                "The other participants responded:\n{}",
                others.join("\n")
            )));
        }
    }

    messages.push(ChatMessage::user(spec.prompt.clone()));
    messages
}
