//! Result encoder - ExecutionOutcome → 6 要素の結果タプル
//!
//! すべての終端状態がここを通るので、呼び出し側は常に同じ形を受け取る。

use serde::Serialize;
use serde::ser::{SerializeTuple, Serializer};
use tracing::debug;

use crate::domain::{ExecutionOutcome, Parameter, TaskValue, TypeSlot};

/// `(exit_code, types, values, target_direction, timed_out, message)`
pub type ResultTuple = (i32, Vec<TypeSlot>, Vec<TaskValue>, Option<Parameter>, bool, String);

/// The worker's sole externally observable artifact.
///
/// Serializes as a six-element array in the fixed field order.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub exit_code: i32,
    pub types: Vec<TypeSlot>,
    pub values: Vec<TaskValue>,
    pub target_direction: Option<Parameter>,
    pub timed_out: bool,
    pub message: String,
}

impl TaskResult {
    pub fn into_tuple(self) -> ResultTuple {
        (
            self.exit_code,
            self.types,
            self.values,
            self.target_direction,
            self.timed_out,
            self.message,
        )
    }
}

impl Serialize for TaskResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(6)?;
        tuple.serialize_element(&self.exit_code)?;
        tuple.serialize_element(&self.types)?;
        tuple.serialize_element(&self.values)?;
        tuple.serialize_element(&self.target_direction)?;
        tuple.serialize_element(&self.timed_out)?;
        tuple.serialize_element(&self.message)?;
        tuple.end()
    }
}

pub fn encode_result(outcome: ExecutionOutcome) -> TaskResult {
    debug!(
        exit_code = outcome.exit_code.code(),
        types = ?outcome.types,
        values = ?outcome.values,
        target_direction = ?outcome.target_direction,
        timed_out = outcome.timed_out,
        message = %outcome.message,
        "finished task execution"
    );
    TaskResult {
        exit_code: outcome.exit_code.code(),
        types: outcome.types,
        values: outcome.values,
        target_direction: outcome.target_direction,
        timed_out: outcome.timed_out,
        message: outcome.message,
    }
}

impl From<ExecutionOutcome> for TaskResult {
    fn from(outcome: ExecutionOutcome) -> Self {
        encode_result(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContentType, Direction};

    #[test]
    fn success_selects_fields_verbatim() {
        let outcome = ExecutionOutcome::success(
            vec![Some(ContentType::Int)],
            vec![TaskValue::Int(1)],
            Some(Parameter::target(Direction::InOut)),
        );
        let (code, types, values, direction, timed_out, message) =
            encode_result(outcome).into_tuple();
        assert_eq!(code, 0);
        assert_eq!(types, vec![Some(ContentType::Int)]);
        assert_eq!(values, vec![TaskValue::Int(1)]);
        assert_eq!(direction.and_then(|p| p.direction), Some(Direction::InOut));
        assert!(!timed_out);
        assert!(message.is_empty());
    }

    #[test]
    fn serializes_as_six_element_array() {
        let result = TaskResult::from(ExecutionOutcome::failed());
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v, serde_json::json!([1, [], [], null, false, ""]));
    }

    #[test]
    fn raised_keeps_message() {
        let result = encode_result(ExecutionOutcome::raised(&[None], &[], "bad input"));
        assert_eq!(result.exit_code, 2);
        assert_eq!(result.values, vec![TaskValue::Null]);
        assert_eq!(result.message, "bad input");
    }
}
