// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Shared test helpers: a scripted model client and engine construction.

// Each integration test crate uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use rostrum::config::Settings;
use rostrum::debate::DebateEngine;
use rostrum::error::{ApiError, Result, RostrumError};
use rostrum::history::HistoryStore;
use rostrum::llm::{
    CallOutcome, GenerateReply, GenerateRequest, ModelClient, ModelSummary, TextStream, TokenUsage,
};

/// One scripted step for the fake client
#[derive(Debug, Clone)]
pub enum Step {
    /// Succeed with this text
    Text(&'static str),
    /// Fail with a network error carrying this message
    Fail(&'static str),
}

/// Model client that replays a fixed script of outcomes
pub struct ScriptedClient {
    steps: Mutex<Vec<Step>>,
    pub calls: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedClient {
    pub fn new(steps: Vec<Step>) -> Self {
        let mut steps = steps;
        steps.reverse();
        Self {
            steps: Mutex::new(steps),
            calls: Mutex::new(vec![]),
        }
    }

    fn next_step(&self) -> Step {
        self.steps
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Step::Fail("script ran dry"))
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn generate(
        &self,
        request: &GenerateRequest,
        _credential: &str,
        _cancel: &CancellationToken,
    ) -> Result<CallOutcome<GenerateReply>> {
        self.calls.lock().unwrap().push(request.clone());
        match self.next_step() {
            Step::Text(text) => Ok(CallOutcome::Completed(GenerateReply {
                text: text.to_string(),
                usage: TokenUsage {
                    prompt: 10,
                    completion: 5,
                    total: 15,
                },
            })),
            Step::Fail(message) => Err(RostrumError::Api(ApiError::Network(message.to_string()))),
        }
    }

    async fn generate_stream(
        &self,
        request: &GenerateRequest,
        _credential: &str,
        _cancel: &CancellationToken,
    ) -> Result<CallOutcome<TextStream>> {
        self.calls.lock().unwrap().push(request.clone());
        match self.next_step() {
            Step::Text(text) => {
                let fragments: Vec<Result<String>> = vec![Ok(text.to_string())];
                Ok(CallOutcome::Completed(Box::pin(futures::stream::iter(
                    fragments,
                ))))
            }
            Step::Fail(message) => Err(RostrumError::Api(ApiError::Network(message.to_string()))),
        }
    }

    async fn list_models(&self, _credential: &str) -> Result<Vec<ModelSummary>> {
        Ok(vec![])
    }
}

/// An engine over a scripted client and a temp-dir history store
pub fn engine_with_script(steps: Vec<Step>, temp_dir: &TempDir) -> DebateEngine {
    let (engine, _) = engine_and_client(steps, temp_dir);
    engine
}

/// Like [`engine_with_script`], but keeps a handle on the client so tests can
/// inspect the requests it received
pub fn engine_and_client(
    steps: Vec<Step>,
    temp_dir: &TempDir,
) -> (DebateEngine, Arc<ScriptedClient>) {
    let mut settings = Settings::default();
    settings.set_credential("test-key");
    settings.streaming = false;
    let history = HistoryStore::open_at(temp_dir.path().join("history.json")).unwrap();
    let client = Arc::new(ScriptedClient::new(steps));
    let engine = DebateEngine::new(client.clone(), settings, history);
    (engine, client)
}
