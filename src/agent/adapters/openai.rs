//! OpenAI-compatible chat-completions backend.
//!
//! Works with any provider exposing `POST {api_base}/chat/completions` with
//! bearer authentication and function-style tool calls, Groq included.

use crate::agent::domain::{AssistantTurn, ChatMessage, Role, ToolCall, ToolSpec};
use crate::agent::ports::{ChatRequest, ModelBackend, ModelError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Default base URL of the Groq OpenAI-compatible API.
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_ERROR_BODY: usize = 512;

/// Model backend speaking the OpenAI chat-completions protocol.
#[derive(Clone)]
pub struct OpenAiCompatibleBackend {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleBackend {
    /// Creates a backend for `model` at `api_base`, authenticating with
    /// `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Transport`] when the HTTP client cannot be built.
    pub fn new(
        api_base: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ModelError> {
        Self::with_timeout(api_base, api_key, model, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Like [`Self::new`] with an explicit per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Transport`] when the HTTP client cannot be built.
    pub fn with_timeout(
        api_base: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ModelError::transport)?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Returns the model identifier sent with each request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for OpenAiCompatibleBackend {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OpenAiCompatibleBackend")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatibleBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<AssistantTurn, ModelError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: request.tools.iter().map(WireTool::from).collect(),
        };
        debug!(
            model = %self.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "requesting chat completion"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ModelError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "chat completion rejected");
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|err| ModelError::InvalidResponse(err.to_string()))?;
        completion.into_turn()
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireCallOut<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        Self {
            role: message.role().as_str(),
            content: message.content(),
            tool_calls: message.tool_calls().iter().map(WireCallOut::from).collect(),
            tool_call_id: message.tool_call_id(),
        }
    }
}

#[derive(Serialize)]
struct WireCallOut<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionOut<'a>,
}

#[derive(Serialize)]
struct WireFunctionOut<'a> {
    name: &'a str,
    arguments: String,
}

impl<'a> From<&'a ToolCall> for WireCallOut<'a> {
    fn from(call: &'a ToolCall) -> Self {
        Self {
            id: &call.id,
            kind: "function",
            function: WireFunctionOut {
                name: &call.name,
                arguments: call.arguments.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionSpec<'a>,
}

#[derive(Serialize)]
struct WireFunctionSpec<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    parameters: &'a Value,
}

impl<'a> From<&'a ToolSpec> for WireTool<'a> {
    fn from(spec: &'a ToolSpec) -> Self {
        Self {
            kind: "function",
            function: WireFunctionSpec {
                name: &spec.name,
                description: spec.description.as_deref(),
                parameters: &spec.parameters,
            },
        }
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireReply,
}

#[derive(Deserialize)]
struct WireReply {
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireCallIn>>,
}

#[derive(Deserialize)]
struct WireCallIn {
    id: String,
    function: WireFunctionIn,
}

#[derive(Deserialize)]
struct WireFunctionIn {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl CompletionResponse {
    fn into_turn(self) -> Result<AssistantTurn, ModelError> {
        let reply = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("completion has no choices".to_owned()))?
            .message;
        if let Some(role) = reply.role
            && role != Role::Assistant
        {
            return Err(ModelError::InvalidResponse(format!(
                "completion authored by '{role}'"
            )));
        }

        let tool_calls = reply
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let arguments = decode_arguments(&call.function.arguments);
                ToolCall::new(call.id, call.function.name, arguments)
            })
            .collect();
        Ok(AssistantTurn {
            content: reply.content.filter(|text| !text.is_empty()),
            tool_calls,
        })
    }
}

/// Decodes the JSON-encoded arguments string of a function call.
///
/// Blank input becomes an empty object. Text that is not JSON is kept as a
/// string so that schema validation reports it back to the model.
fn decode_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("", json!({}))]
    #[case("{\"a\":3,\"b\":5}", json!({"a": 3, "b": 5}))]
    #[case("a=3", json!("a=3"))]
    fn arguments_are_decoded_leniently(#[case] raw: &str, #[case] expected: Value) {
        assert_eq!(decode_arguments(raw), expected);
    }

    #[test]
    fn tool_call_messages_use_function_wire_format() {
        let message = ChatMessage::assistant_tool_calls(
            None,
            vec![ToolCall::new("call-1", "add", json!({"a": 3, "b": 5}))],
        );
        let wire = serde_json::to_value(WireMessage::from(&message)).expect("serialise message");
        assert_eq!(
            wire,
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call-1",
                    "type": "function",
                    "function": {"name": "add", "arguments": "{\"a\":3,\"b\":5}"}
                }]
            })
        );
    }

    #[test]
    fn empty_choices_are_rejected() {
        let response = CompletionResponse { choices: Vec::new() };
        assert!(matches!(
            response.into_turn(),
            Err(ModelError::InvalidResponse(_))
        ));
    }
}
