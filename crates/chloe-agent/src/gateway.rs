// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion calls with a per-attempt deadline and bounded retries.
//!
//! The gateway never fails towards the user: when every attempt fails, the
//! answer is a fixed apology and the conversation is left unanswered.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, warn};

use chloe_config::model::OpenAiConfig;
use chloe_core::types::{CompletionRequest, PromptMessage};
use chloe_core::{ChloeError, CompletionProvider};

use crate::conversation::ConversationContext;

/// Reply sent when every completion attempt failed.
pub const APOLOGY: &str = "I apologize, but the OpenAI API is currently experiencing high traffic. \
     Kindly try again at a later time.";

/// Deadline, retry and sampling settings for completion calls.
#[derive(Debug, Clone)]
pub struct GatewayPolicy {
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    pub temperature: f32,
}

impl GatewayPolicy {
    pub fn from_config(config: &OpenAiConfig) -> Self {
        Self {
            attempt_timeout: Duration::from_secs(config.completion_timeout_secs),
            max_attempts: config.max_attempts,
            temperature: config.temperature,
        }
    }
}

impl Default for GatewayPolicy {
    fn default() -> Self {
        Self::from_config(&OpenAiConfig::default())
    }
}

pub struct CompletionGateway {
    provider: Arc<dyn CompletionProvider>,
    policy: GatewayPolicy,
}

impl CompletionGateway {
    pub fn new(provider: Arc<dyn CompletionProvider>, policy: GatewayPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &GatewayPolicy {
        &self.policy
    }

    /// Ask the provider for the top choice, retrying failed, timed-out and
    /// empty responses. Each attempt gets a fresh deadline.
    pub async fn complete(
        &self,
        messages: Vec<PromptMessage>,
        model: &str,
    ) -> Result<String, ChloeError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let request = CompletionRequest {
                model: model.to_string(),
                messages: messages.clone(),
                temperature: self.policy.temperature,
            };
            let started = Instant::now();
            let outcome =
                tokio::time::timeout(self.policy.attempt_timeout, self.provider.complete(request))
                    .await;

            let err = match outcome {
                Ok(Ok(response)) => match response.choices.into_iter().next() {
                    Some(answer) => {
                        debug!(
                            attempt,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            provider = self.provider.name(),
                            "completion succeeded"
                        );
                        return Ok(answer);
                    }
                    None => ChloeError::provider("completion returned no choices"),
                },
                Ok(Err(e)) => e,
                Err(_) => ChloeError::Timeout {
                    duration: self.policy.attempt_timeout,
                },
            };
            warn!(attempt, max_attempts = attempts, error = %err, "completion attempt failed");
            last_error = Some(err);
        }

        Err(last_error.unwrap_or_else(|| ChloeError::Internal("no completion attempt made".into())))
    }

    /// One full exchange on `context`: rebuild the window, complete, and on
    /// success record the answer and the activity time.
    pub async fn ask(&self, context: &mut ConversationContext, question: &str) -> String {
        context.prepare_turn(question, Instant::now());
        match self
            .complete(context.prompt_messages(), context.model())
            .await
        {
            Ok(answer) => {
                context.mark_active(Instant::now());
                context.attach_answer(&answer);
                answer
            }
            Err(e) => {
                error!(chat_id = %context.chat_id(), error = %e, "completion failed, sending apology");
                APOLOGY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chloe_core::types::Role;
    use chloe_test_utils::{ScriptedProvider, Step};

    use crate::conversation::ConversationSettings;

    fn policy(max_attempts: u32) -> GatewayPolicy {
        GatewayPolicy {
            attempt_timeout: Duration::from_secs(100),
            max_attempts,
            temperature: 0.9,
        }
    }

    fn context() -> ConversationContext {
        let settings = Arc::new(ConversationSettings {
            bot_name: "Chloe".into(),
            greeting: "You are Chloe.".into(),
            model: "gpt-test".into(),
            stale_after: Duration::from_secs(60),
            token_budget: 3000,
            idle_eviction: None,
        });
        ConversationContext::new("tg-1".into(), settings, Instant::now())
    }

    #[tokio::test]
    async fn succeeds_within_retry_budget() {
        let provider = ScriptedProvider::with_steps([
            Step::Fail("rate limited".into()),
            Step::Fail("502".into()),
            Step::Reply("third time lucky".into()),
        ]);
        let gateway = CompletionGateway::new(Arc::new(provider.clone()), policy(3));

        let answer = gateway.complete(vec![PromptMessage::user("hi")], "gpt-test").await;
        assert_eq!(answer.unwrap(), "third time lucky");
        assert_eq!(provider.call_count().await, 3);
    }

    #[tokio::test]
    async fn exhausted_attempts_yield_apology() {
        let provider = ScriptedProvider::with_steps([
            Step::Fail("down".into()),
            Step::Empty,
            Step::Fail("down".into()),
            Step::Reply("too late".into()),
        ]);
        let gateway = CompletionGateway::new(Arc::new(provider.clone()), policy(3));
        let mut ctx = context();

        let answer = gateway.ask(&mut ctx, "hello").await;
        assert_eq!(answer, APOLOGY);
        assert_eq!(provider.call_count().await, 3);
        assert!(ctx.last_activity().is_none());
        assert!(ctx.turns().last().unwrap().answer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempt_times_out_and_retries() {
        let provider = ScriptedProvider::with_steps([Step::Hang, Step::Reply("ok".into())]);
        let gateway = CompletionGateway::new(Arc::new(provider.clone()), policy(2));

        let started = Instant::now();
        let answer = gateway.complete(vec![PromptMessage::user("hi")], "gpt-test").await;
        assert_eq!(answer.unwrap(), "ok");
        assert!(started.elapsed() >= Duration::from_secs(100));
    }

    #[tokio::test(start_paused = true)]
    async fn every_attempt_timing_out_reports_timeout() {
        let provider = ScriptedProvider::with_steps([Step::Hang, Step::Hang]);
        let gateway = CompletionGateway::new(Arc::new(provider), policy(2));

        let err = gateway
            .complete(vec![PromptMessage::user("hi")], "gpt-test")
            .await
            .unwrap_err();
        assert!(matches!(err, ChloeError::Timeout { .. }));
    }

    #[tokio::test]
    async fn ask_sends_window_and_records_answer() {
        let provider = ScriptedProvider::with_replies(["first answer", "second answer"]);
        let gateway = CompletionGateway::new(Arc::new(provider.clone()), policy(3));
        let mut ctx = context();

        assert_eq!(gateway.ask(&mut ctx, "first").await, "first answer");
        assert_eq!(gateway.ask(&mut ctx, "second").await, "second answer");

        let requests = provider.requests().await;
        let last = &requests[1];
        assert_eq!(last.model, "gpt-test");
        assert_eq!(last.temperature, 0.9);
        let roles: Vec<_> = last.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert!(ctx.last_activity().is_some());
        assert_eq!(ctx.turns().last().unwrap().answer, "second answer");
    }

    #[test]
    fn default_policy_matches_config_defaults() {
        let policy = GatewayPolicy::default();
        assert_eq!(policy.attempt_timeout, Duration::from_secs(100));
        assert_eq!(policy.max_attempts, 3);
    }
}
