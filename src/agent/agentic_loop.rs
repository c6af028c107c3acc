//! Agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! executes any tool calls in the response, appends results, and repeats
//! until the model produces a final text response or the iteration limit
//! is reached. Every executed call is recorded as a [`ToolStep`].

use std::time::Duration;

use tracing::debug;

use super::executor::ToolExecutor;
use super::message::{ChatRequest, ChatResponse, assistant_tool_calls_message, tool_message};
use super::provider::LlmProvider;
use super::retrieval::with_deadline;
use super::tool::{ToolCall, ToolResult};
use crate::error::AgentError;

/// One executed tool call and what it returned.
#[derive(Debug, Clone)]
pub struct ToolStep {
    /// The call as requested by the model.
    pub call: ToolCall,
    /// What the executor returned.
    pub result: ToolResult,
}

/// Final model response plus the tool steps that led to it.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// The model's final (tool-free) response.
    pub response: ChatResponse,
    /// Executed tool calls, in invocation order.
    pub steps: Vec<ToolStep>,
}

/// Runs an agentic loop: model → tool calls → tool results → model → …
///
/// # Arguments
///
/// * `provider` - LLM provider to call.
/// * `request` - Initial chat request (mutated in-place with tool messages).
/// * `executor` - Dispatches tool calls.
/// * `max_iterations` - Safety limit on round-trips.
/// * `timeout` - Deadline for each model call.
///
/// # Errors
///
/// Returns [`AgentError::ToolLoopExceeded`] if the model keeps requesting
/// tools beyond `max_iterations`, [`AgentError::Timeout`] if a model call
/// exceeds `timeout`. Propagates any provider errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    executor: &dyn ToolExecutor,
    max_iterations: usize,
    timeout: Duration,
) -> Result<LoopOutcome, AgentError> {
    let mut steps = Vec::new();

    for iteration in 0..max_iterations {
        let response = with_deadline("generation", timeout, provider.chat(request)).await?;

        // If no tool calls, we have a final answer
        if response.tool_calls.is_empty() {
            debug!(
                iteration,
                tool_steps = steps.len(),
                "agentic loop completed with final text response"
            );
            return Ok(LoopOutcome { response, steps });
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        request
            .messages
            .push(assistant_tool_calls_message(response.tool_calls.clone()));

        for call in response.tool_calls {
            let result = executor.execute(&call).await;
            debug!(
                tool = call.name,
                call_id = call.id,
                is_error = result.is_error,
                "tool execution complete"
            );
            request
                .messages
                .push(tool_message(&result.tool_call_id, &result.content));
            steps.push(ToolStep { call, result });
        }
    }

    Err(AgentError::ToolLoopExceeded { max_iterations })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{TokenUsage, system_message, user_message};

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Mock provider that returns tool calls on the first N calls,
    /// then a final text response.
    struct MockToolProvider {
        call_count: AtomicUsize,
        tool_rounds: usize,
    }

    impl MockToolProvider {
        fn new(tool_rounds: usize) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                tool_rounds,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockToolProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            let count = self.call_count.fetch_add(1, Ordering::SeqCst);

            if count < self.tool_rounds {
                Ok(ChatResponse {
                    content: String::new(),
                    usage: TokenUsage::default(),
                    tool_calls: vec![ToolCall {
                        id: format!("call_{count}"),
                        name: "semantic_search".to_string(),
                        arguments: format!(r#"{{"search_term":"term {count}"}}"#),
                    }],
                    finish_reason: Some("tool_calls".to_string()),
                })
            } else {
                Ok(ChatResponse {
                    content: "Final answer based on tool results.".to_string(),
                    usage: TokenUsage {
                        prompt_tokens: 100,
                        completion_tokens: 20,
                        total_tokens: 120,
                    },
                    tool_calls: Vec::new(),
                    finish_reason: Some("stop".to_string()),
                })
            }
        }
    }

    /// Echoes the call ID back as the result.
    struct EchoExecutor;

    #[async_trait]
    impl ToolExecutor for EchoExecutor {
        async fn execute(&self, call: &ToolCall) -> ToolResult {
            ToolResult {
                tool_call_id: call.id.clone(),
                content: format!("result for {}", call.id),
                is_error: false,
            }
        }
    }

    /// Provider that never answers in time.
    struct StalledProvider;

    #[async_trait]
    impl LlmProvider for StalledProvider {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(AgentError::ApiRequest {
                message: "unreachable".to_string(),
                status: None,
            })
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test".to_string(),
            messages: vec![system_message("test"), user_message("query")],
            temperature: Some(0.0),
            max_tokens: Some(1024),
            tools: Vec::new(),
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_agentic_loop_single_tool_round() {
        let provider = MockToolProvider::new(1);
        let mut request = request();

        let outcome = agentic_loop(&provider, &mut request, &EchoExecutor, 10, TIMEOUT)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.response.content, "Final answer based on tool results.");
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.steps[0].result.content, "result for call_0");
        // system + user + assistant(tool_calls) + tool(result)
        assert_eq!(request.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_agentic_loop_multiple_rounds_keeps_order() {
        let provider = MockToolProvider::new(3);
        let mut request = request();

        let outcome = agentic_loop(&provider, &mut request, &EchoExecutor, 10, TIMEOUT)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        let ids: Vec<&str> = outcome.steps.iter().map(|s| s.call.id.as_str()).collect();
        assert_eq!(ids, vec!["call_0", "call_1", "call_2"]);
        assert_eq!(request.messages.len(), 8);
    }

    #[tokio::test]
    async fn test_agentic_loop_exceeds_max() {
        let provider = MockToolProvider::new(100);
        let mut request = request();

        let result = agentic_loop(&provider, &mut request, &EchoExecutor, 2, TIMEOUT).await;
        assert!(
            matches!(result, Err(AgentError::ToolLoopExceeded { max_iterations: 2 })),
            "Expected ToolLoopExceeded"
        );
    }

    #[tokio::test]
    async fn test_agentic_loop_no_tools() {
        let provider = MockToolProvider::new(0);
        let mut request = request();

        let outcome = agentic_loop(&provider, &mut request, &EchoExecutor, 10, TIMEOUT)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert!(outcome.steps.is_empty());
        assert_eq!(request.messages.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_agentic_loop_times_out() {
        let mut request = request();
        let result = agentic_loop(
            &StalledProvider,
            &mut request,
            &EchoExecutor,
            10,
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(
            result,
            Err(AgentError::Timeout {
                operation: "generation",
                ..
            })
        ));
    }
}
