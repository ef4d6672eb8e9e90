//! Exception data as captured at the point an error is logged.
//!
//! An [`ExceptionChain`] is a finite, ordered list of [`ExceptionFrame`]s:
//! the error that was raised first, followed by each of its causes. Frames
//! are plain data, so chains can be built from a Rust [`Error`] with
//! [`ExceptionChain::capture`] or deserialized from another process.

use std::error::Error;
use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Frames kept in a chain at most. Longer (or cyclic) cause chains are cut.
pub const MAX_DEPTH: usize = 64;

/// One entry of a call stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEntry {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    /// How the function was invoked (`->`, `::`), when meaningful.
    #[serde(default)]
    pub call_type: Option<String>,
    /// Argument values, for rendering only. Never part of a fingerprint.
    #[serde(default)]
    pub args: Vec<String>,
}

impl StackEntry {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: Some(function.into()),
            ..Self::default()
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_class(mut self, class: impl Into<String>, call_type: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self.call_type = Some(call_type.into());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// A single error in a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionFrame {
    /// Type tag, e.g. `std::io::Error`. Empty when unknown.
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub trace: Vec<StackEntry>,
}

impl ExceptionFrame {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    /// Set the source location the error was raised at.
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_trace(mut self, trace: Vec<StackEntry>) -> Self {
        self.trace = trace;
        self
    }
}

/// An error followed by its causes, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExceptionChain(Vec<ExceptionFrame>);

impl ExceptionChain {
    /// Build a chain from frames, keeping at most [`MAX_DEPTH`] of them.
    pub fn new(frames: impl IntoIterator<Item = ExceptionFrame>) -> Self {
        Self(frames.into_iter().take(MAX_DEPTH).collect())
    }

    /// Capture `error` and its [`source`](Error::source) chain.
    ///
    /// The outermost frame is tagged with the type name of `E` and the
    /// location of the caller. Causes are only known as `dyn Error`, so they
    /// carry their message alone.
    ///
    /// ```
    /// use exhibit_processor::ExceptionChain;
    ///
    /// let error = std::fs::read("/nonexistent").unwrap_err();
    /// let chain = ExceptionChain::capture(&error);
    ///
    /// assert_eq!(chain.len(), 1);
    /// assert!(chain.frames()[0].kind.ends_with("Error"));
    /// ```
    #[track_caller]
    pub fn capture<E: Error>(error: &E) -> Self {
        let location = Location::caller();
        let outermost = ExceptionFrame::new(std::any::type_name::<E>(), error.to_string())
            .at(location.file(), location.line());

        let mut frames = vec![outermost];
        let mut cause = error.source();
        while let Some(current) = cause {
            if frames.len() == MAX_DEPTH {
                tracing::debug!(depth = MAX_DEPTH, "exception chain truncated");
                break;
            }
            frames.push(ExceptionFrame::new("", current.to_string()));
            cause = current.source();
        }

        Self(frames)
    }

    pub fn frames(&self) -> &[ExceptionFrame] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExceptionFrame> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ExceptionFrame> for ExceptionChain {
    fn from_iter<T: IntoIterator<Item = ExceptionFrame>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl From<ExceptionFrame> for ExceptionChain {
    fn from(frame: ExceptionFrame) -> Self {
        Self(vec![frame])
    }
}
