//! Quick mode: classify the prompt, pick the user's preferred model and run
//! a single-branch dispatch.

use super::dispatch::{DispatchHandle, DispatchSpec, Dispatcher};
use super::event::StreamEvent;
use crate::store::{branch_succeeded, DebateStore, Outcome};
use std::fmt;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Prompt intent categories. The set is closed; the classifier falls back to
/// `General` when nothing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Code,
    Writing,
    Analysis,
    Math,
    General,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Code => "code",
            Category::Writing => "writing",
            Category::Analysis => "analysis",
            Category::Math => "math",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CODE_KEYWORDS: &[&str] = &[
    "code", "function", "bug", "debug", "compile", "rust", "python", "javascript", "typescript",
    "api", "sql", "regex", "refactor", "implement", "script", "error message", "stack trace",
];

const WRITING_KEYWORDS: &[&str] = &[
    "write", "essay", "story", "poem", "email", "letter", "blog", "article", "rewrite",
    "paraphrase", "summarize", "draft", "tone",
];

const ANALYSIS_KEYWORDS: &[&str] = &[
    "analyze", "analyse", "compare", "evaluate", "pros and cons", "tradeoff", "trade-off",
    "assess", "review", "critique", "explain why", "implications",
];

const MATH_KEYWORDS: &[&str] = &[
    "calculate", "solve", "equation", "integral", "derivative", "probability", "theorem",
    "proof", "algebra", "geometry", "statistics",
];

/// Classify a prompt by keyword hits; most hits wins, ties broken by the
/// order code > writing > analysis > math.
pub fn classify(prompt: &str) -> Category {
    let lowered = prompt.to_lowercase();
    let count = |keywords: &[&str]| keywords.iter().filter(|k| lowered.contains(*k)).count();

    let scored = [
        (Category::Code, count(CODE_KEYWORDS)),
        (Category::Writing, count(WRITING_KEYWORDS)),
        (Category::Analysis, count(ANALYSIS_KEYWORDS)),
        (Category::Math, count(MATH_KEYWORDS)),
    ];

    scored
        .into_iter()
        .filter(|(_, hits)| *hits > 0)
        .max_by_key(|(_, hits)| *hits)
        .map(|(category, _)| category)
        .unwrap_or(Category::General)
}

/// A routed quick-mode run.
pub struct QuickRoute {
    pub category: Category,
    pub model: String,
    pub events: ReceiverStream<StreamEvent>,
}

/// Routes a prompt to one model based on stored preferences, then feeds the
/// outcome back into the preference counters.
#[derive(Clone)]
pub struct QuickRouter {
    dispatcher: Dispatcher,
    store: Arc<dyn DebateStore>,
    default_model: String,
}

impl QuickRouter {
    pub fn new(
        dispatcher: Dispatcher,
        store: Arc<dyn DebateStore>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            store,
            default_model: default_model.into(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Classify, pick the model and start the single-branch dispatch.
    ///
    /// Preference lookup failures fall back to the default model rather than
    /// failing the request. For identified users the run's outcome (win on
    /// completion, loss on error) is recorded fire-and-forget; anonymous
    /// runs leave no trace.
    pub async fn route(
        &self,
        prompt: String,
        user: Option<String>,
        cancel: CancellationToken,
    ) -> QuickRoute {
        let category = classify(&prompt);

        let model = match &user {
            Some(user) => match self.store.preferred_model(user, category.as_str()).await {
                Ok(Some(preferred)) => {
                    debug!(user = %user, category = %category, model = %preferred,
                        "Using stored model preference");
                    preferred
                }
                Ok(None) => self.default_model.clone(),
                Err(e) => {
                    warn!(error = %e, "Preference lookup failed, using default model");
                    self.default_model.clone()
                }
            },
            None => self.default_model.clone(),
        };

        info!(category = %category, model = %model, "Quick-mode dispatch");
        metrics::counter!("promptpit_quick_requests_total",
            "category" => category.as_str()
        )
        .increment(1);

        let spec = DispatchSpec::single(prompt, model.clone());
        let DispatchHandle { events, finished } = self.dispatcher.dispatch(spec, cancel);

        if let Some(user) = user {
            let store = Arc::clone(&self.store);
            let model = model.clone();
            tokio::spawn(async move {
                let Ok(branches) = finished.await else {
                    return;
                };
                let Some(branch) = branches.first() else {
                    return;
                };
                let outcome = if branch_succeeded(branch) {
                    Outcome::Win
                } else {
                    Outcome::Loss
                };
                if let Err(e) = store
                    .record_outcome(&user, category.as_str(), &model, outcome)
                    .await
                {
                    warn!(error = %e, "Failed to record quick-mode outcome");
                }
            });
        }

        QuickRoute {
            category,
            model,
            events,
        }
    }
}
