//! Validated-name type for MCP servers.

use super::ToolRegistryDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for an MCP server name.
const MAX_SERVER_NAME_LENGTH: usize = 100;

/// Validated MCP server name.
///
/// Server names are the registry's primary key: every tool descriptor refers
/// back to its owning server by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct McpServerName(String);

impl McpServerName {
    /// Creates a validated MCP server name.
    ///
    /// The input is trimmed and lowercased. Only characters in `[a-z0-9_-]`
    /// are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        let normalized = value.into().trim().to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(ToolRegistryDomainError::EmptyServerName);
        }

        let is_valid = normalized.chars().all(|character| {
            character.is_ascii_lowercase()
                || character.is_ascii_digit()
                || character == '_'
                || character == '-'
        });
        if !is_valid {
            return Err(ToolRegistryDomainError::InvalidServerName(normalized));
        }

        if normalized.len() > MAX_SERVER_NAME_LENGTH {
            return Err(ToolRegistryDomainError::ServerNameTooLong(normalized));
        }

        Ok(Self(normalized))
    }

    /// Returns the MCP server name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for McpServerName {
    type Error = ToolRegistryDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<McpServerName> for String {
    fn from(value: McpServerName) -> Self {
        value.0
    }
}

impl AsRef<str> for McpServerName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for McpServerName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("math", "math")]
    #[case("  Weather ", "weather")]
    #[case("brave-search", "brave-search")]
    #[case("my_server_2", "my_server_2")]
    fn accepts_and_normalizes_names(#[case] input: &str, #[case] expected: &str) {
        let name = McpServerName::new(input).expect("name should be valid");
        assert_eq!(name.as_str(), expected);
    }

    #[test]
    fn rejects_blank_name() {
        assert_eq!(
            McpServerName::new("   "),
            Err(ToolRegistryDomainError::EmptyServerName)
        );
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(matches!(
            McpServerName::new("math server"),
            Err(ToolRegistryDomainError::InvalidServerName(_))
        ));
    }

    #[test]
    fn rejects_overlong_name() {
        let long = "a".repeat(MAX_SERVER_NAME_LENGTH + 1);
        assert!(matches!(
            McpServerName::new(long),
            Err(ToolRegistryDomainError::ServerNameTooLong(_))
        ));
    }

    #[test]
    fn deserialization_validates() {
        let parsed: Result<McpServerName, _> = serde_json::from_str("\"bad name\"");
        assert!(parsed.is_err());
    }
}
