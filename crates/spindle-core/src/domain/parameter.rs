//! Parameter model: one decoded task argument.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::value::TaskValue;

/// Language-level kind of a task argument.
///
/// There is no double-precision lane: wire DOUBLE values are decoded as `Float`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    File,
    Directory,
    Collection,
    DictCollection,
    ExternalPsco,
    ExternalStream,
    String,
    Int,
    Long,
    Float,
    Boolean,
    Object,
}

impl ContentType {
    /// Types whose value travels as a path reference instead of inline content.
    pub fn is_file_backed(self) -> bool {
        matches!(
            self,
            ContentType::File
                | ContentType::Directory
                | ContentType::Collection
                | ContentType::DictCollection
                | ContentType::ExternalStream
        )
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentType::File => "FILE",
            ContentType::Directory => "DIRECTORY",
            ContentType::Collection => "COLLECTION",
            ContentType::DictCollection => "DICT_COLLECTION",
            ContentType::ExternalPsco => "EXTERNAL_PSCO",
            ContentType::ExternalStream => "EXTERNAL_STREAM",
            ContentType::String => "STRING",
            ContentType::Int => "INT",
            ContentType::Long => "LONG",
            ContentType::Float => "FLOAT",
            ContentType::Boolean => "BOOLEAN",
            ContentType::Object => "OBJECT",
        };
        f.write_str(name)
    }
}

/// Standard stream redirection role of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StdStream {
    #[default]
    None,
    Stdin,
    Stdout,
    Stderr,
}

/// Declared data-flow role of a parameter.
///
/// `Commutative` は INOUT と同じく書き戻しが必要（マージは順不同）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    In,
    Out,
    InOut,
    Commutative,
}

impl Direction {
    pub fn requires_write_back(self) -> bool {
        matches!(self, Direction::InOut | Direction::Commutative)
    }
}

/// Path reference of a file-backed parameter.
///
/// Wire form is `original[:alias]`; an alias of `null` or empty means none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileName {
    pub original_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<PathBuf>,
}

impl FileName {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((original, alias)) if !alias.is_empty() && alias != "null" => Self {
                original_path: PathBuf::from(original),
                alias: Some(PathBuf::from(alias)),
            },
            Some((original, _)) => Self {
                original_path: PathBuf::from(original),
                alias: None,
            },
            None => Self {
                original_path: PathBuf::from(raw),
                alias: None,
            },
        }
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }
}

/// One decoded task argument.
///
/// Created by the decoder, read-only during dispatch except for the receiver
/// whose `content` is filled in by the materializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub content_type: ContentType,
    pub stream: StdStream,
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<TaskValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<FileName>,
    pub extra_content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            name: name.into(),
            content_type,
            stream: StdStream::None,
            prefix: String::new(),
            content: None,
            file_name: None,
            extra_content_type: String::new(),
            direction: None,
        }
    }

    /// Parameter describing the receiver's resolved direction, as returned by
    /// instance methods in `CallOutput::target_direction`.
    pub fn target(direction: Direction) -> Self {
        Self::new("self", ContentType::Object).with_direction(direction)
    }

    pub fn with_content(mut self, content: TaskValue) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_file_name(mut self, file_name: FileName) -> Self {
        self.file_name = Some(file_name);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// `true` when there is no inline value (absent, null, or an empty string).
    pub fn has_empty_content(&self) -> bool {
        match &self.content {
            None | Some(TaskValue::Null) => true,
            Some(TaskValue::Str(s)) => s.is_empty(),
            Some(_) => false,
        }
    }

    /// Value handed to output/nulling logic; absent content reads as null.
    pub fn value(&self) -> TaskValue {
        self.content.clone().unwrap_or(TaskValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("/tmp/a.bin", "/tmp/a.bin", None)]
    #[case::alias("/tmp/a.bin:/work/d1v2.IT", "/tmp/a.bin", Some("/work/d1v2.IT"))]
    #[case::null_alias("/tmp/a.bin:null", "/tmp/a.bin", None)]
    fn file_name_parses_alias(
        #[case] raw: &str,
        #[case] original: &str,
        #[case] alias: Option<&str>,
    ) {
        let f = FileName::parse(raw);
        assert_eq!(f.original_path(), Path::new(original));
        assert_eq!(f.alias.as_deref(), alias.map(Path::new));
    }

    #[test]
    fn empty_content_detection() {
        let p = Parameter::new("x", ContentType::Object);
        assert!(p.has_empty_content());
        assert!(p.clone().with_content(TaskValue::Str(String::new())).has_empty_content());
        assert!(!p.with_content(TaskValue::Int(0)).has_empty_content());
    }

    #[test]
    fn only_inout_and_commutative_need_write_back() {
        assert!(Direction::InOut.requires_write_back());
        assert!(Direction::Commutative.requires_write_back());
        assert!(!Direction::In.requires_write_back());
        assert!(!Direction::Out.requires_write_back());
    }

    #[test]
    fn content_type_serializes_as_wire_names() {
        let s = serde_json::to_string(&ContentType::DictCollection).unwrap();
        assert_eq!(s, "\"DICT_COLLECTION\"");
        assert_eq!(ContentType::ExternalPsco.to_string(), "EXTERNAL_PSCO");
    }
}
