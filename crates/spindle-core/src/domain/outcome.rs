//! Outcome model: the result of one invocation.
//!
//! Produced exactly once per invocation by the supervisor and consumed once
//! by the result encoder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::parameter::{ContentType, Parameter};
use super::value::TaskValue;

/// One entry of the `types` sequence.
///
/// `None` is the padding slot placed ahead of class-method arguments; it
/// carries no semantic type.
pub type TypeSlot = Option<ContentType>;

/// Exit codes understood by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitCode {
    Success,
    /// Generic, attribute or import failure.
    Failure,
    /// Application-raised exception.
    Raised,
    TimedOut,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::Failure => 1,
            ExitCode::Raised => 2,
            ExitCode::TimedOut => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub exit_code: ExitCode,
    pub types: Vec<TypeSlot>,
    pub values: Vec<TaskValue>,
    pub target_direction: Option<Parameter>,
    pub timed_out: bool,
    pub message: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionOutcome {
    fn new(exit_code: ExitCode, types: Vec<TypeSlot>, values: Vec<TaskValue>) -> Self {
        Self {
            exit_code,
            types,
            values,
            target_direction: None,
            timed_out: false,
            message: String::new(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Outputs taken verbatim from the callable.
    pub fn success(
        types: Vec<TypeSlot>,
        values: Vec<TaskValue>,
        target_direction: Option<Parameter>,
    ) -> Self {
        let mut outcome = Self::new(ExitCode::Success, types, values);
        outcome.target_direction = target_direction;
        outcome
    }

    pub fn timed_out(types: &[TypeSlot], args: &[Parameter]) -> Self {
        let values = null_outputs(types, args);
        let mut outcome = Self::new(ExitCode::TimedOut, types.to_vec(), values);
        outcome.timed_out = true;
        outcome
    }

    pub fn raised(types: &[TypeSlot], args: &[Parameter], message: impl Into<String>) -> Self {
        let values = null_outputs(types, args);
        let mut outcome = Self::new(ExitCode::Raised, types.to_vec(), values);
        outcome.message = message.into();
        outcome
    }

    /// Failure with genuinely absent outputs (not nulled).
    pub fn failed() -> Self {
        Self::new(ExitCode::Failure, Vec::new(), Vec::new())
    }

    /// Marks the outcome failed while keeping the outputs already computed.
    pub fn downgrade_to_failure(&mut self) {
        self.exit_code = ExitCode::Failure;
    }

    pub fn with_timing(mut self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self.finished_at = Some(finished_at);
        self
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == ExitCode::Success
    }
}

/// Placeholder outputs for a call that never produced any.
///
/// Walks the type slots alongside the call arguments: EXTERNAL_PSCO entries
/// keep their value (the persistent identifier), every other entry becomes
/// `Null`. A padding slot consumes no argument.
pub fn null_outputs(types: &[TypeSlot], args: &[Parameter]) -> Vec<TaskValue> {
    let mut args = args.iter();
    types
        .iter()
        .map(|slot| match slot {
            None => TaskValue::Null,
            Some(content_type) => match args.next() {
                Some(arg) if *content_type == ContentType::ExternalPsco => arg.value(),
                _ => TaskValue::Null,
            },
        })
        .collect()
}
