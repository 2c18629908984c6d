//! Positional cursor over the raw argument vector.

use std::str::FromStr;

use thiserror::Error;

use crate::ports::CodecError;

/// Malformed wire data. Fatal for the whole invocation.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("argument vector ended early: expected {field} at slot {position}")]
    MissingSlot { position: usize, field: &'static str },

    #[error("invalid {field} '{value}' at slot {position}")]
    InvalidNumber {
        position: usize,
        field: &'static str,
        value: String,
    },

    #[error("unknown parameter type code {0}")]
    UnknownType(i32),

    #[error("unknown stream code {0}")]
    UnknownStream(i32),

    #[error("invalid base64 in string parameter '{name}': {source}")]
    Base64 {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("codec failure in string parameter '{name}': {source}")]
    Codec {
        name: String,
        #[source]
        source: CodecError,
    },
}

pub struct WireReader<'a> {
    slots: &'a [String],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(slots: &'a [String]) -> Self {
        Self { slots, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.slots.len().saturating_sub(self.pos)
    }

    pub fn next(&mut self, field: &'static str) -> Result<&'a str, DecodeError> {
        let slot = self.slots.get(self.pos).ok_or(DecodeError::MissingSlot {
            position: self.pos,
            field,
        })?;
        self.pos += 1;
        Ok(slot.as_str())
    }

    pub fn next_parsed<T: FromStr>(&mut self, field: &'static str) -> Result<T, DecodeError> {
        let position = self.pos;
        let raw = self.next(field)?;
        raw.trim().parse().map_err(|_| DecodeError::InvalidNumber {
            position,
            field,
            value: raw.to_string(),
        })
    }

    pub fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [String], DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.slots.len())
            .ok_or(DecodeError::MissingSlot {
                position: self.slots.len(),
                field,
            })?;
        let taken = &self.slots[self.pos..end];
        self.pos = end;
        Ok(taken)
    }
}
