//! Judge relay: drives a tool-calling model over the completed responses
//! and relays its structured scoring as stream events.

use super::dispatch::RoundResponse;
use super::event::{CategoryScore, ScoreBoard, StreamEvent, VerdictSummary};
use crate::provider::{ChatMessage, ChatRequest, ProviderEvent, ProviderRegistry, ToolSpec};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Generous ceiling; a full scoring pass is a few hundred tokens of
/// tool arguments.
const JUDGE_MAX_TOKENS: u32 = 2048;

/// Input to one judging pass.
#[derive(Debug, Clone)]
pub struct JudgeSpec {
    pub prompt: String,
    pub responses: Vec<RoundResponse>,
    /// Arena flavor steering the rubric (debate, code, writing). None gets
    /// the general rubric.
    pub arena: Option<String>,
}

/// Arguments of one `score_response` tool call.
#[derive(Debug, Deserialize)]
struct ScoreArgs {
    model: String,
    category: String,
    score: f64,
    rationale: String,
}

/// Arguments of the final `declare_winner` tool call.
#[derive(Debug, Deserialize)]
struct WinnerArgs {
    winner: String,
    verdict: String,
    #[serde(default)]
    highlight: Option<String>,
}

/// Handle returned by [`JudgeRelay::judge`].
///
/// `events` is the relayed stream; `finished` resolves with the accumulated
/// scoreboard and verdict once the pass is over, for attaching the judgement
/// to the persisted debate row.
pub struct JudgeHandle {
    pub events: ReceiverStream<StreamEvent>,
    pub finished: oneshot::Receiver<(ScoreBoard, Option<VerdictSummary>)>,
}

/// Streams a judge model's tool calls as scoring and verdict events.
///
/// The relay is strictly incremental: each tool call is forwarded as soon as
/// it is decoded, and a terminal `complete` event repeats the accumulated
/// state so a client that missed intermediate events can reconcile.
#[derive(Clone)]
pub struct JudgeRelay {
    providers: Arc<ProviderRegistry>,
    judge_model: String,
}

impl JudgeRelay {
    pub fn new(providers: Arc<ProviderRegistry>, judge_model: impl Into<String>) -> Self {
        Self {
            providers,
            judge_model: judge_model.into(),
        }
    }

    pub fn judge_model(&self) -> &str {
        &self.judge_model
    }

    /// Run one judging pass, returning the relayed event stream and a
    /// completion receiver.
    ///
    /// Malformed tool arguments are dropped without aborting (the raw
    /// `tool_call` marker is still relayed). The stream always ends with
    /// exactly one `complete` event, even after an upstream error.
    pub fn judge(&self, spec: JudgeSpec, cancel: CancellationToken) -> JudgeHandle {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = oneshot::channel();
        let providers = Arc::clone(&self.providers);
        let judge_model = self.judge_model.clone();

        tokio::spawn(async move {
            info!(
                judge = %judge_model,
                responses = spec.responses.len(),
                arena = spec.arena.as_deref().unwrap_or("general"),
                "Starting judge relay"
            );
            run_judge(providers, judge_model, spec, tx, done_tx, cancel).await;
        });

        JudgeHandle {
            events: ReceiverStream::new(rx),
            finished: done_rx,
        }
    }
}

async fn run_judge(
    providers: Arc<ProviderRegistry>,
    judge_model: String,
    spec: JudgeSpec,
    tx: mpsc::Sender<StreamEvent>,
    done_tx: oneshot::Sender<(ScoreBoard, Option<VerdictSummary>)>,
    cancel: CancellationToken,
) {
    let mut scores: ScoreBoard = BTreeMap::new();
    let mut verdict: Option<VerdictSummary> = None;

    let result = drive_judge(
        &providers,
        &judge_model,
        &spec,
        &tx,
        &cancel,
        &mut scores,
        &mut verdict,
    )
    .await;

    if let Err(error) = result {
        warn!(judge = %judge_model, error = %error, "Judge relay failed");
        metrics::counter!("promptpit_judge_errors_total").increment(1);
        let _ = tx
            .send(StreamEvent::Error {
                model: judge_model.clone(),
                error,
            })
            .await;
    }

    // Terminal reconciliation event, sent on success and failure alike.
    let _ = done_tx.send((scores.clone(), verdict.clone()));
    let _ = tx.send(StreamEvent::Complete { scores, verdict }).await;
}

async fn drive_judge(
    providers: &ProviderRegistry,
    judge_model: &str,
    spec: &JudgeSpec,
    tx: &mpsc::Sender<StreamEvent>,
    cancel: &CancellationToken,
    scores: &mut ScoreBoard,
    verdict: &mut Option<VerdictSummary>,
) -> Result<(), String> {
    let client = providers
        .client_for(judge_model)
        .ok_or_else(|| format!("No provider configured for judge model '{judge_model}'"))?;

    let request = ChatRequest {
        model: judge_model.to_string(),
        messages: build_judge_messages(spec),
        max_tokens: Some(JUDGE_MAX_TOKENS),
        temperature: Some(0.0),
        tools: judge_tools(),
    };

    let mut stream = client
        .stream_chat(request)
        .await
        .map_err(|e| e.to_string())?;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Err("Request cancelled".to_string()),
            next = stream.next() => match next {
                None | Some(Ok(ProviderEvent::Done)) => return Ok(()),
                // The judge's free text is not part of the protocol.
                Some(Ok(ProviderEvent::Content(_))) => {}
                Some(Ok(ProviderEvent::ToolCall { name, arguments })) => {
                    if tx
                        .send(StreamEvent::ToolCall { tool: name.clone() })
                        .await
                        .is_err()
                    {
                        return Err("Client disconnected".to_string());
                    }
                    if let Some(event) = map_tool_call(&name, &arguments, scores, verdict) {
                        if tx.send(event).await.is_err() {
                            return Err("Client disconnected".to_string());
                        }
                    }
                }
                Some(Err(e)) => return Err(e.to_string()),
            },
        }
    }
}

/// Map one decoded tool call to its stream event, updating the accumulated
/// state. Returns None for unknown tools or malformed arguments.
fn map_tool_call(
    name: &str,
    arguments: &str,
    scores: &mut ScoreBoard,
    verdict: &mut Option<VerdictSummary>,
) -> Option<StreamEvent> {
    match name {
        "score_response" => match serde_json::from_str::<ScoreArgs>(arguments) {
            Ok(args) => {
                scores.entry(args.model.clone()).or_default().insert(
                    args.category.clone(),
                    CategoryScore {
                        score: args.score,
                        rationale: args.rationale.clone(),
                    },
                );
                Some(StreamEvent::Scoring {
                    model: args.model,
                    category: args.category,
                    score: args.score,
                    rationale: args.rationale,
                })
            }
            Err(e) => {
                warn!(error = %e, "Skipping malformed score_response arguments");
                None
            }
        },
        "declare_winner" => match serde_json::from_str::<WinnerArgs>(arguments) {
            Ok(args) => {
                *verdict = Some(VerdictSummary {
                    winner: args.winner.clone(),
                    verdict: args.verdict.clone(),
                    highlight: args.highlight.clone(),
                });
                Some(StreamEvent::Verdict {
                    winner: args.winner,
                    verdict: args.verdict,
                    highlight: args.highlight,
                })
            }
            Err(e) => {
                warn!(error = %e, "Skipping malformed declare_winner arguments");
                None
            }
        },
        other => {
            warn!(tool = other, "Judge invoked an unknown tool");
            None
        }
    }
}

/// The two-tool rubric every judging pass uses.
fn judge_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "score_response".to_string(),
            description: "Score one model's response in one category, \
                          with a short rationale."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "model": {
                        "type": "string",
                        "description": "The model whose response is scored"
                    },
                    "category": {
                        "type": "string",
                        "description": "The category being scored, e.g. clarity or rigor"
                    },
                    "score": {
                        "type": "number",
                        "description": "Score from 1 to 10"
                    },
                    "rationale": {
                        "type": "string",
                        "description": "One or two sentences justifying the score"
                    }
                },
                "required": ["model", "category", "score", "rationale"]
            }),
        },
        ToolSpec {
            name: "declare_winner".to_string(),
            description: "Declare the overall winner once every response \
                          has been scored."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "winner": {
                        "type": "string",
                        "description": "The winning model"
                    },
                    "verdict": {
                        "type": "string",
                        "description": "A short explanation of the decision"
                    },
                    "highlight": {
                        "type": "string",
                        "description": "An optional standout quote from the winning response"
                    }
                },
                "required": ["winner", "verdict"]
            }),
        },
    ]
}

fn build_judge_messages(spec: &JudgeSpec) -> Vec<ChatMessage> {
    let focus = match spec.arena.as_deref() {
        Some("debate") => "argument quality, rigor and persuasiveness",
        Some("code") => "correctness, clarity and idiomatic style",
        Some("writing") => "prose quality, structure and voice",
        _ => "overall quality, accuracy and clarity",
    };

    let mut prompt = format!(
        "You are judging responses to the following prompt:\n\n{}\n\n\
         Evaluate each response on {focus}. Score every response in at \
         least two categories using score_response, then call \
         declare_winner exactly once.\n",
        spec.prompt
    );
    for response in &spec.responses {
        prompt.push_str(&format!(
            "\n--- Response from {} ---\n{}\n",
            response.model, response.content
        ));
    }

    vec![
        ChatMessage::system(
            "You are an impartial judge. Use only the provided tools; \
             do not reply in free text.",
        ),
        ChatMessage::user(prompt),
    ]
}
