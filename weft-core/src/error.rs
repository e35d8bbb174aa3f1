use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Result type for weft-core operations (boxed to reduce size on stack)
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Fatal, process-level errors.
///
/// Everything item-scoped (a bad tool, a failed build, an unreachable URL)
/// travels as a [`crate::Diagnostic`] instead. This enum is reserved for
/// conditions with no object to attach a diagnostic to: the config file
/// itself is unreadable or unparseable, or a manifest cannot be written.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to read '{path}'")]
    #[diagnostic(help("run 'weft init' to scaffold a new project"))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse weft.toml")]
    #[diagnostic(code(weft::parse_error))]
    Parse {
        #[source_code]
        src: NamedSource<String>,
        #[label("parse error here")]
        span: Option<SourceSpan>,
        #[source]
        source: toml::de::Error,
    },

    #[error("{message}")]
    #[diagnostic(code(weft::validation_error))]
    Validation {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: Option<SourceSpan>,
        message: String,
    },

    #[error("failed to write '{path}'")]
    #[diagnostic(code(weft::write_error))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {what}")]
    #[diagnostic(code(weft::serialize_error))]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{message}")]
    #[diagnostic(code(weft::internal_error))]
    Internal { message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Box<Self> {
        Box::new(Error::Io {
            path: path.into(),
            source,
        })
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Box<Self> {
        Box::new(Error::Write {
            path: path.into(),
            source,
        })
    }

    pub fn serialize(what: impl Into<String>, source: serde_json::Error) -> Box<Self> {
        Box::new(Error::Serialize {
            what: what.into(),
            source,
        })
    }
}

/// Source context for config error reporting.
///
/// Encapsulates the raw config text and filename so validation sites don't
/// thread both through every call.
#[derive(Debug, Clone)]
pub struct SourceContext {
    src: String,
    filename: String,
}

impl SourceContext {
    pub fn new(src: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            filename: filename.into(),
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.filename, self.src.clone())
    }

    /// Create a parse error from a toml error.
    pub fn parse_error(&self, source: toml::de::Error) -> Box<Error> {
        let span = source.span().map(SourceSpan::from);
        Box::new(Error::Parse {
            src: self.named_source(),
            span,
            source,
        })
    }

    /// Create a validation error without a span.
    pub fn validation_error(&self, message: impl Into<String>) -> Box<Error> {
        Box::new(Error::Validation {
            src: self.named_source(),
            span: None,
            message: message.into(),
        })
    }

    /// Create a validation error with a span.
    pub fn validation_error_at(
        &self,
        message: impl Into<String>,
        span: impl Into<SourceSpan>,
    ) -> Box<Error> {
        Box::new(Error::Validation {
            src: self.named_source(),
            span: Some(span.into()),
            message: message.into(),
        })
    }

    /// Find the span of a quoted string value in the TOML source.
    ///
    /// Searches for `"value"` and `'value'`; used to point validation errors
    /// at the offending literal. No fallback: a missing span is better than a
    /// span pointing at the wrong place.
    pub fn find_value_span(&self, value: &str) -> Option<SourceSpan> {
        for quote in ['"', '\''] {
            let pattern = format!("{quote}{value}{quote}");
            if let Some(pos) = self.src.find(&pattern) {
                return Some(SourceSpan::from((pos + 1, value.len())));
            }
        }
        None
    }
}
