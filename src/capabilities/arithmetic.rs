//! Deterministic add/subtract phrase evaluation
//!
//! Evaluates requests like "What is 9 added to 5 and then 13 subtracted
//! from the result?" without any language model: integers are taken in
//! order of appearance, operations in textual order, and folded left to
//! right over the running result.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::capability::{Capability, CapabilityError, StateSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Subtract,
}

impl Op {
    fn apply(self, acc: i64, operand: i64) -> i64 {
        match self {
            Op::Add => acc + operand,
            Op::Subtract => acc - operand,
        }
    }
}

/// Addition/subtraction specialist
pub struct ArithmeticCapability;

fn parse(request: &str) -> (Vec<i64>, Vec<Op>) {
    let mut numbers = Vec::new();
    let mut ops = Vec::new();

    for token in request.split_whitespace() {
        // Standalone operator symbols count as operations; hyphens inside
        // words do not.
        match token {
            "+" => {
                ops.push(Op::Add);
                continue;
            }
            "-" => {
                ops.push(Op::Subtract);
                continue;
            }
            _ => {}
        }

        let trimmed = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());
        if trimmed.is_empty() {
            continue;
        }

        if let Ok(n) = trimmed.parse::<i64>() {
            numbers.push(n);
            continue;
        }

        let word = trimmed.to_lowercase();
        if word.starts_with("add") || word == "plus" {
            ops.push(Op::Add);
        } else if word.starts_with("subtract") || word == "minus" {
            ops.push(Op::Subtract);
        }
    }

    (numbers, ops)
}

fn evaluate(request: &str) -> Result<i64, CapabilityError> {
    let (numbers, ops) = parse(request);

    let (&first, rest) = numbers.split_first().ok_or_else(|| {
        CapabilityError::InvalidRequest(format!("no numbers in request: '{request}'"))
    })?;

    if ops.len() != rest.len() {
        return Err(CapabilityError::InvalidRequest(format!(
            "cannot pair {} operation(s) with {} number(s)",
            ops.len(),
            numbers.len(),
        )));
    }

    Ok(ops
        .iter()
        .zip(rest)
        .fold(first, |acc, (op, &n)| op.apply(acc, n)))
}

#[async_trait]
impl Capability for ArithmeticCapability {
    async fn invoke(&self, request: &str, _state: StateSnapshot) -> Result<Value, CapabilityError> {
        evaluate(request).map(|result| json!(result))
    }
}
