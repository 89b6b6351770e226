//! Contract of the deployed example handler.
//!
//! The handler increments `number` and returns it as a string. The updated
//! handler additionally understands arithmetic requests carrying `action`,
//! `first_number` and `second_number`.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerLogLevel {
    Debug,
    Info,
    Error,
}

impl HandlerLogLevel {
    /// `debug` and `info` are honoured; anything else, including unset, logs errors only.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("debug") => Self::Debug,
            Some("info") => Self::Info,
            _ => Self::Error,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticAction {
    Plus,
    Minus,
    Times,
    Divide,
}

impl ArithmeticAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "plus" => Some(Self::Plus),
            "minus" => Some(Self::Minus),
            "times" | "product" => Some(Self::Times),
            "divide" => Some(Self::Divide),
            _ => None,
        }
    }

    fn apply(self, first: f64, second: f64) -> Result<f64, HandlerError> {
        match self {
            Self::Plus => Ok(first + second),
            Self::Minus => Ok(first - second),
            Self::Times => Ok(first * second),
            Self::Divide if second == 0.0 => Err(HandlerError::DivideByZero),
            Self::Divide => Ok(first / second),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("unsupported action '{0}'")]
    UnsupportedAction(String),
    #[error("field '{0}' must be a number")]
    NotANumber(&'static str),
    #[error("cannot divide by zero")]
    DivideByZero,
    #[error("number {0} is too large to increment")]
    OutOfRange(i128),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandlerReply {
    pub result: String,
    /// Info-level line describing what was computed.
    pub summary: String,
}

pub fn handle_event(event: &Value) -> Result<HandlerReply, HandlerError> {
    match event.get("action").and_then(Value::as_str) {
        Some(action) => arithmetic(action, event),
        None => increment(event),
    }
}

fn increment(event: &Value) -> Result<HandlerReply, HandlerError> {
    let number = event.get("number").map(integer_value).unwrap_or(0);
    let incremented = number.checked_add(1).ok_or(HandlerError::OutOfRange(number))?;
    Ok(HandlerReply {
        result: incremented.to_string(),
        summary: format!("You provided {number} and it was incremented to {incremented}"),
    })
}

fn arithmetic(action: &str, event: &Value) -> Result<HandlerReply, HandlerError> {
    let operation = ArithmeticAction::parse(action)
        .ok_or_else(|| HandlerError::UnsupportedAction(action.to_string()))?;
    let first = number_field(event, "first_number")?;
    let second = number_field(event, "second_number")?;
    let result = format_number(operation.apply(first, second)?);
    Ok(HandlerReply {
        summary: format!(
            "The {action} of {} and {} is {result}",
            format_number(first),
            format_number(second)
        ),
        result,
    })
}

/// Integer coercion: numbers truncate, numeric strings parse, anything else is 0.
/// Widened to `i128` so every JSON integer, including `u64::MAX`, can be incremented.
fn integer_value(value: &Value) -> i128 {
    match value {
        Value::Number(number) => number
            .as_i64()
            .map(i128::from)
            .or_else(|| number.as_u64().map(i128::from))
            .or_else(|| number.as_f64().map(truncate))
            .unwrap_or(0),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i128>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(truncate))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Saturates at the `i128` bounds; NaN becomes 0.
fn truncate(value: f64) -> i128 {
    value.trunc() as i128
}

fn number_field(event: &Value, field: &'static str) -> Result<f64, HandlerError> {
    match event.get(field) {
        Some(Value::Number(number)) => number.as_f64().ok_or(HandlerError::NotANumber(field)),
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| HandlerError::NotANumber(field)),
        _ => Err(HandlerError::NotANumber(field)),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
