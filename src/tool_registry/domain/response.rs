//! Tool call results returned by MCP servers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Embedded resource carried by a [`ContentBlock::Resource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedResource {
    /// Resource URI.
    pub uri: String,
    /// Inline text content, when the resource is textual.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Resource MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// One block of tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// Text content.
        text: String,
    },
    /// Base64-encoded image data.
    Image {
        /// Encoded image bytes.
        data: String,
        /// Image MIME type.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Embedded resource.
    Resource {
        /// Resource payload.
        resource: EmbeddedResource,
    },
    /// Any block type this client does not model.
    #[serde(other)]
    Unsupported,
}

impl ContentBlock {
    /// Creates a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Result of an MCP `tools/call` request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    /// Ordered output blocks.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Whether the tool reported a failure.
    #[serde(default)]
    pub is_error: bool,
    /// Optional machine-readable result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl ToolResponse {
    /// Creates a successful single-text response.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            ..Self::default()
        }
    }

    /// Creates a failed single-text response.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: true,
            structured_content: None,
        }
    }

    /// Concatenates all text blocks (and textual embedded resources) with
    /// newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Resource { resource } => resource.text.as_deref(),
                ContentBlock::Image { .. } | ContentBlock::Unsupported => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_wire_result() {
        let response: ToolResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "8"},
                {"type": "image", "data": "aGk=", "mimeType": "image/png"},
                {"type": "audio", "data": "x"}
            ],
            "isError": false
        }))
        .expect("result should parse");

        assert_eq!(response.content.len(), 3);
        assert_eq!(response.content.get(2), Some(&ContentBlock::Unsupported));
        assert_eq!(response.text(), "8");
        assert!(!response.is_error);
    }

    #[test]
    fn text_joins_blocks() {
        let response = ToolResponse {
            content: vec![
                ContentBlock::text("first"),
                ContentBlock::Resource {
                    resource: EmbeddedResource {
                        uri: "file:///note.txt".to_owned(),
                        text: Some("second".to_owned()),
                        mime_type: None,
                    },
                },
            ],
            ..ToolResponse::default()
        };
        assert_eq!(response.text(), "first\nsecond");
    }

    #[test]
    fn serializes_error_flag_in_camel_case() {
        let value = serde_json::to_value(ToolResponse::error("boom")).expect("serialize");
        assert_eq!(value.get("isError"), Some(&json!(true)));
    }
}
