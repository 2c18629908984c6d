//! InvocationDecoder - ヘッダ + パラメータレコード → TaskInvocation
//!
//! ```text
//! [0] target_path  [1] method_name  [2] timeout_seconds  [3] num_slaves
//! [4 .. 4+num_slaves) slaves
//! computing_units, has_receiver, return_arity, num_params, records...
//! ```

use std::sync::Arc;

use tracing::debug;

use super::params::ParameterDecoder;
use super::wire::{DecodeError, WireReader};
use crate::domain::{CallContext, TaskInvocation};
use crate::ports::ObjectCodec;

pub struct InvocationDecoder {
    params: ParameterDecoder,
}

impl InvocationDecoder {
    pub fn new(codec: Arc<dyn ObjectCodec>) -> Self {
        Self {
            params: ParameterDecoder::new(codec),
        }
    }

    /// Decodes one invocation. `context` is the worker-side auxiliary bag;
    /// its `return_length` and `from_worker` are filled in here.
    pub fn decode(
        &self,
        slots: &[String],
        mut context: CallContext,
    ) -> Result<TaskInvocation, DecodeError> {
        let mut reader = WireReader::new(slots);

        let target_path = reader.next("target path")?.to_string();
        let method_name = reader.next("method name")?.to_string();
        let timeout_seconds: u64 = reader.next_parsed("timeout")?;
        let num_slaves: usize = reader.next_parsed("slave count")?;
        let slaves = reader.take(num_slaves, "slave identifiers")?.to_vec();
        let computing_units = reader.next("computing units")?.to_string();
        let has_receiver = reader.next("has receiver")? == "true";
        let return_arity: usize = reader.next_parsed("return arity")?;
        let num_params: usize = reader.next_parsed("parameter count")?;

        debug!(
            target_path = %target_path,
            method_name = %method_name,
            timeout_seconds,
            ?slaves,
            computing_units = %computing_units,
            has_receiver,
            return_arity,
            num_params,
            "decoded invocation header"
        );

        let parameters = self.params.decode_parameters(num_params, &mut reader)?;
        if reader.remaining() > 0 {
            debug!(
                trailing = reader.remaining(),
                "ignoring slots after the last parameter"
            );
        }

        context.from_worker = true;
        context.return_length = return_arity;

        Ok(TaskInvocation {
            target_path,
            method_name,
            timeout_seconds,
            slaves,
            computing_units,
            has_receiver,
            return_arity,
            parameters,
            auxiliary: context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContentType, TaskValue};
    use crate::impls::JsonCodec;

    fn slots(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn decoder() -> InvocationDecoder {
        InvocationDecoder::new(Arc::new(JsonCodec::new()))
    }

    #[test]
    fn decodes_header_and_parameters() {
        let s = slots(&[
            "app.tasks", "increment", "10", "2", "node-a", "node-b", "4", "false", "1", "2",
            "4", "3", "", "x", "int", "42",
            "9", "3", "", "out", "file", "/tmp/result",
        ]);
        let context = CallContext {
            process_name: "worker-0".into(),
            ..CallContext::default()
        };
        let inv = decoder().decode(&s, context).unwrap();

        assert_eq!(inv.target_path, "app.tasks");
        assert_eq!(inv.method_name, "increment");
        assert_eq!(inv.qualified_name(), "app.tasks.increment");
        assert_eq!(inv.timeout_seconds, 10);
        assert_eq!(inv.slaves, vec!["node-a".to_string(), "node-b".to_string()]);
        assert_eq!(inv.computing_units, "4");
        assert!(!inv.has_receiver);
        assert_eq!(inv.return_arity, 1);
        assert_eq!(inv.parameters.len(), 2);
        assert_eq!(inv.parameters[0].content, Some(TaskValue::Int(42)));
        assert_eq!(inv.parameters[1].content_type, ContentType::File);

        assert!(inv.auxiliary.from_worker);
        assert_eq!(inv.auxiliary.return_length, 1);
        assert_eq!(inv.auxiliary.process_name, "worker-0");
    }

    #[test]
    fn receiver_flag_is_literal_true() {
        let base = ["m.C", "f", "0", "0", "1"];
        for (flag, expected) in [("true", true), ("True", false), ("1", false)] {
            let mut raw: Vec<&str> = base.to_vec();
            raw.extend([flag, "0", "0"]);
            let inv = decoder().decode(&slots(&raw), CallContext::default()).unwrap();
            assert_eq!(inv.has_receiver, expected, "flag {flag}");
        }
    }

    #[test]
    fn truncated_header_is_a_decode_error() {
        let s = slots(&["m", "f", "0", "3", "only-one-slave"]);
        let err = decoder().decode(&s, CallContext::default()).unwrap_err();
        assert!(matches!(err, DecodeError::MissingSlot { field: "slave identifiers", .. }));
    }

    #[test]
    fn missing_parameter_records_fail() {
        let s = slots(&["m", "f", "0", "0", "1", "false", "0", "2", "4", "3", "", "x", "int", "1"]);
        assert!(decoder().decode(&s, CallContext::default()).is_err());
    }

    #[test]
    fn huge_counts_are_decode_errors() {
        let s = slots(&["m", "f", "0", "18446744073709551615", "1", "false", "0", "0"]);
        let err = decoder().decode(&s, CallContext::default()).unwrap_err();
        assert!(matches!(err, DecodeError::MissingSlot { field: "slave identifiers", .. }));

        let s = slots(&["m", "f", "0", "0", "1", "false", "0", "100000000000000000", "4", "3", "", "x", "int", "1"]);
        let err = decoder().decode(&s, CallContext::default()).unwrap_err();
        assert!(matches!(err, DecodeError::MissingSlot { .. }));
    }
}
