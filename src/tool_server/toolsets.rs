//! Demo toolsets served by the bundled binaries.

use super::handler::{FnTool, ToolDefinition, ToolServer};
use crate::tool_registry::domain::ToolResponse;
use rmcp::ErrorData;
use serde_json::{Map, Value, json};

/// Forecast returned by `get_weather` for Colombo.
pub const COLOMBO_FORECAST: &str = "It's always sunny and humid in Colombo, around 31°C.";

fn integer_pair_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "a": {"type": "integer"},
            "b": {"type": "integer"},
        },
        "required": ["a", "b"],
        "additionalProperties": false,
    })
}

/// Lower bound of `i64` as an exactly representable float.
const I64_MIN_F64: f64 = -9_223_372_036_854_775_808.0;

/// Reads an integer argument, accepting floats with no fractional part.
fn integer_arg(arguments: &Map<String, Value>, name: &str) -> Result<i64, ErrorData> {
    let value = arguments.get(name);
    value
        .and_then(Value::as_i64)
        .or_else(|| value.and_then(Value::as_f64).and_then(integral_i64))
        .ok_or_else(|| ErrorData::invalid_params(format!("'{name}' must be an integer"), None))
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the value is integral and inside the i64 range"
)]
fn integral_i64(number: f64) -> Option<i64> {
    (number.fract().abs() < f64::EPSILON && (I64_MIN_F64..-I64_MIN_F64).contains(&number))
        .then_some(number as i64)
}

fn arithmetic(
    name: &'static str,
    description: &'static str,
    op: fn(i64, i64) -> Option<i64>,
) -> FnTool<impl Fn(&Map<String, Value>) -> Result<ToolResponse, ErrorData> + Send + Sync> {
    let definition = ToolDefinition::new(name, description, integer_pair_schema());
    FnTool::new(definition, move |arguments: &Map<String, Value>| {
        let a = integer_arg(arguments, "a")?;
        let b = integer_arg(arguments, "b")?;
        Ok(op(a, b).map_or_else(
            || ToolResponse::error(format!("{name}({a}, {b}) overflows a 64-bit integer")),
            |value| ToolResponse::from_text(value.to_string()),
        ))
    })
}

/// Builds the `math` server exposing `add` and `multiply`.
#[must_use]
pub fn math_server() -> ToolServer {
    ToolServer::new("math")
        .with_tool(arithmetic("add", "Add two integers", i64::checked_add))
        .with_tool(arithmetic(
            "multiply",
            "Multiply two integers",
            i64::checked_mul,
        ))
}

/// Returns the forecast text for `location`.
#[must_use]
pub fn forecast(location: &str) -> String {
    if location.trim().eq_ignore_ascii_case("colombo") {
        COLOMBO_FORECAST.to_owned()
    } else {
        format!("It's sunny in {}.", location.trim())
    }
}

/// Builds the `weather` server exposing `get_weather`.
#[must_use]
pub fn weather_server() -> ToolServer {
    let definition = ToolDefinition::new(
        "get_weather",
        "Get the current weather for a location",
        json!({
            "type": "object",
            "properties": {"location": {"type": "string"}},
            "required": ["location"],
        }),
    );
    ToolServer::new("weather").with_tool(FnTool::new(
        definition,
        |arguments: &Map<String, Value>| {
            let location = arguments
                .get("location")
                .and_then(Value::as_str)
                .ok_or_else(|| ErrorData::invalid_params("'location' must be a string", None))?;
            Ok(ToolResponse::from_text(forecast(location)))
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;
    use rstest::rstest;

    async fn try_call(
        server: &ToolServer,
        name: &str,
        arguments: Value,
    ) -> Result<ToolResponse, ErrorData> {
        let Value::Object(map) = arguments else {
            panic!("arguments must be an object");
        };
        server.call(name, Some(map)).await
    }

    async fn call(server: &ToolServer, name: &str, arguments: Value) -> ToolResponse {
        try_call(server, name, arguments).await.expect("tool response")
    }

    #[rstest]
    #[case("add", 3, 5, "8")]
    #[case("multiply", 8, 10, "80")]
    #[case("add", -4, 4, "0")]
    #[tokio::test(flavor = "multi_thread")]
    async fn math_tools_compute(
        #[case] tool: &str,
        #[case] a: i64,
        #[case] b: i64,
        #[case] expected: &str,
    ) {
        let response = call(&math_server(), tool, json!({"a": a, "b": b})).await;
        assert_eq!(response.text(), expected);
        assert!(!response.is_error);
    }

    #[rstest]
    #[case(json!({"a": 3.0, "b": 5}), "8")]
    #[case(json!({"a": -2.0, "b": 2.0}), "0")]
    #[tokio::test(flavor = "multi_thread")]
    async fn integral_floats_count_as_integers(#[case] arguments: Value, #[case] expected: &str) {
        let response = call(&math_server(), "add", arguments).await;
        assert_eq!(response.text(), expected);
        assert!(!response.is_error);
    }

    #[rstest]
    #[case(json!({"a": 3.5, "b": 5}))]
    #[case(json!({"a": 1e19, "b": 1}))]
    #[tokio::test(flavor = "multi_thread")]
    async fn non_integral_numbers_are_rejected(#[case] arguments: Value) {
        let err = try_call(&math_server(), "add", arguments)
            .await
            .expect_err("not an integer");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn integral_conversion_respects_i64_bounds() {
        assert_eq!(integral_i64(I64_MIN_F64), Some(i64::MIN));
        assert_eq!(integral_i64(-I64_MIN_F64), None);
        assert_eq!(integral_i64(f64::NAN), None);
        assert_eq!(integral_i64(42.0), Some(42));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn overflow_is_a_tool_error() {
        let response = call(&math_server(), "multiply", json!({"a": i64::MAX, "b": 2})).await;
        assert!(response.is_error);
    }

    #[rstest]
    #[case("Colombo", COLOMBO_FORECAST)]
    #[case(" colombo ", COLOMBO_FORECAST)]
    #[case("Oslo", "It's sunny in Oslo.")]
    fn forecasts(#[case] location: &str, #[case] expected: &str) {
        assert_eq!(forecast(location), expected);
    }

    #[test]
    fn servers_expose_expected_tools() {
        assert_eq!(math_server().tool_names(), vec!["add", "multiply"]);
        assert_eq!(weather_server().tool_names(), vec!["get_weather"]);
    }
}
