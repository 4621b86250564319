//! Message classification
//!
//! A message is classified by asking a chat-completion model to pick the
//! best-matching part name, given the current catalog and the labels recent
//! messages received. The model's answer is free text; [`Classification`]
//! records whether it names an existing part.

use std::sync::Arc;
use async_trait::async_trait;
use crate::storage::{SqliteStore, HISTORY_LIMIT};
use crate::Result;

pub mod openai;
pub mod prompt;

pub use openai::OpenAiClient;
pub use prompt::{Prompt, NO_MATCH_LABEL};

/// Outcome of resolving a model label against the part catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The label is exactly the name of an existing part
    MatchedPart { part_id: i64, label: String },
    /// The label names no part; it is kept as free text
    UnmatchedLabel(String),
}

impl Classification {
    /// The raw label as returned by the model
    pub fn label(&self) -> &str {
        match self {
            Classification::MatchedPart { label, .. } => label,
            Classification::UnmatchedLabel(label) => label,
        }
    }

    pub fn part_id(&self) -> Option<i64> {
        match self {
            Classification::MatchedPart { part_id, .. } => Some(*part_id),
            Classification::UnmatchedLabel(_) => None,
        }
    }
}

/// Failures talking to the completion endpoint
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("request to completion endpoint failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

/// A text-completion backend
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the prompt and return the first choice's content, untrimmed
    async fn complete(&self, prompt: &Prompt) -> std::result::Result<String, ClassificationError>;
}

/// Builds classification prompts from the store and sends them to a [`CompletionClient`]
#[derive(Clone)]
pub struct ClassificationService {
    store: SqliteStore,
    client: Arc<dyn CompletionClient>,
    fallback_label: Option<String>,
}

impl ClassificationService {
    pub fn new(store: SqliteStore, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            store,
            client,
            fallback_label: None,
        }
    }

    /// Use `label` instead of failing when the completion call fails
    pub fn with_fallback_label(mut self, label: Option<String>) -> Self {
        self.fallback_label = label;
        self
    }

    /// Produce a label for `text`.
    ///
    /// Catalog and history are read fresh on every call. Store errors always
    /// propagate; completion errors propagate unless a fallback label is set.
    pub async fn classify(&self, text: &str) -> Result<String> {
        let (names, history) = self
            .store
            .run(|store| Ok((store.part_names()?, store.recent_history(HISTORY_LIMIT)?)))
            .await?;

        tracing::debug!(
            parts = names.len(),
            history = history.len(),
            "Built classification context"
        );

        let prompt = Prompt::build(&names, &history, text);

        let outcome = self
            .client
            .complete(&prompt)
            .await
            .and_then(|content| {
                let label = content.trim();
                if label.is_empty() {
                    Err(ClassificationError::MalformedResponse(
                        "empty completion content".to_string(),
                    ))
                } else {
                    Ok(label.to_string())
                }
            });

        match (outcome, &self.fallback_label) {
            (Ok(label), _) => Ok(label),
            (Err(e), Some(fallback)) => {
                tracing::warn!("Classification failed, using fallback label {:?}: {}", fallback, e);
                Ok(fallback.clone())
            }
            (Err(e), None) => Err(e.into()),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns a canned answer and remembers the prompts it was sent
    struct CannedClient {
        answer: std::result::Result<String, u16>,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl CannedClient {
        fn answering(answer: &str) -> Self {
            Self { answer: Ok(answer.to_string()), prompts: Mutex::new(Vec::new()) }
        }

        fn failing(status: u16) -> Self {
            Self { answer: Err(status), prompts: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl CompletionClient for CannedClient {
        async fn complete(&self, prompt: &Prompt) -> std::result::Result<String, ClassificationError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            match &self.answer {
                Ok(answer) => Ok(answer.clone()),
                Err(status) => Err(ClassificationError::Status {
                    status: *status,
                    body: "upstream unavailable".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_classify_trims_and_sends_context() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_part("Battery", None).unwrap();
        store.insert_part("Screen", None).unwrap();
        store.insert_message("u0", "screen cracked", "Screen").unwrap();

        let client = Arc::new(CannedClient::answering("  Battery\n"));
        let service = ClassificationService::new(store, client.clone());

        let label = service.classify("my battery died").await.unwrap();
        assert_eq!(label, "Battery");

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].user.contains("Battery, Screen"));
        assert!(prompts[0].user.contains("\"screen cracked\" → Screen"));
        assert!(prompts[0].user.contains("my battery died"));
    }

    #[tokio::test]
    async fn test_failure_propagates_without_fallback() {
        let store = SqliteStore::open_in_memory().unwrap();
        let service = ClassificationService::new(store, Arc::new(CannedClient::failing(503)));

        let err = service.classify("anything").await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Classification(ClassificationError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_answer_is_malformed() {
        let store = SqliteStore::open_in_memory().unwrap();
        let service = ClassificationService::new(store, Arc::new(CannedClient::answering("  \n")));

        let err = service.classify("anything").await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Classification(ClassificationError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_fallback_label_used_on_failure() {
        let store = SqliteStore::open_in_memory().unwrap();
        let service = ClassificationService::new(store, Arc::new(CannedClient::failing(500)))
            .with_fallback_label(Some(NO_MATCH_LABEL.to_string()));

        assert_eq!(service.classify("anything").await.unwrap(), "Unknown");
    }
}
