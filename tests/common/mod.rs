//! Shared test utilities for the integration tests under tests/.
//!
//! Provides a scripted completion client so the GraphQL flow can run without
//! calling a real model endpoint.

use async_trait::async_trait;
use partmatch::classify::{ClassificationError, CompletionClient, Prompt};
use partmatch::graphql::{build_schema, PartmatchSchema};
use partmatch::{ClassificationService, SqliteStore};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Completion client that replays queued answers and records every prompt.
/// Once the queue is empty it answers with the default answer.
pub struct ScriptedClient {
    answers: Mutex<VecDeque<Result<String, u16>>>,
    default_answer: String,
    prompts: Mutex<Vec<Prompt>>,
}

#[allow(dead_code)]
impl ScriptedClient {
    pub fn new(default_answer: &str) -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            default_answer: default_answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue the next answer
    pub fn answer(&self, label: &str) {
        self.answers.lock().unwrap().push_back(Ok(label.to_string()));
    }

    /// Queue a failed call with the given HTTP status
    pub fn fail(&self, status: u16) {
        self.answers.lock().unwrap().push_back(Err(status));
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, ClassificationError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        let next = self.answers.lock().unwrap().pop_front();
        match next {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(status)) => Err(ClassificationError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
            None => Ok(self.default_answer.clone()),
        }
    }
}

/// Schema over a fresh in-memory store, plus handles to the store and client
#[allow(dead_code)]
pub fn test_schema(default_answer: &str) -> (PartmatchSchema, SqliteStore, Arc<ScriptedClient>) {
    let store = SqliteStore::open_in_memory().unwrap();
    let client = Arc::new(ScriptedClient::new(default_answer));
    let classifier = ClassificationService::new(store.clone(), client.clone());
    (build_schema(store.clone(), classifier), store, client)
}
