//! Error type shared by all quiver crates.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

pub type Result<T, E = QuiverError> = std::result::Result<T, E>;

/// Return early with a "not implemented" error.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)+) => {{
        let msg = format!($($arg)+);
        return Err($crate::QuiverError::new(format!("Not yet implemented: {msg}")));
    }};
}

#[derive(Debug)]
pub struct QuiverError {
    inner: Box<QuiverErrorInner>,
}

#[derive(Debug)]
struct QuiverErrorInner {
    msg: String,
    source: Option<Box<dyn Error + Send + Sync>>,
    /// Additional key/value pairs rendered after the message.
    fields: Vec<(&'static str, String)>,
    backtrace: Backtrace,
}

impl QuiverError {
    pub fn new(msg: impl Into<String>) -> Self {
        QuiverError {
            inner: Box::new(QuiverErrorInner {
                msg: msg.into(),
                source: None,
                fields: Vec::new(),
                backtrace: Backtrace::capture(),
            }),
        }
    }

    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        let mut err = Self::new(msg);
        err.inner.source = Some(source);
        err
    }

    /// Attach a field to the error, providing additional context.
    pub fn with_field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.inner.fields.push((key, value.to_string()));
        self
    }

    pub fn get_msg(&self) -> &str {
        self.inner.msg.as_str()
    }

    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.inner
            .fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_backtrace(&self) -> &Backtrace {
        &self.inner.backtrace
    }
}

impl fmt::Display for QuiverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.msg)?;
        for (key, value) in &self.inner.fields {
            write!(f, " [{key}: {value}]")?;
        }
        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }
        if self.inner.backtrace.status() == BacktraceStatus::Captured {
            write!(f, "\nBacktrace: {}", self.inner.backtrace)?;
        }
        Ok(())
    }
}

impl Error for QuiverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<fmt::Error> for QuiverError {
    fn from(value: fmt::Error) -> Self {
        QuiverError::with_source("Format error", Box::new(value))
    }
}

impl From<std::str::Utf8Error> for QuiverError {
    fn from(value: std::str::Utf8Error) -> Self {
        QuiverError::with_source("Invalid utf8", Box::new(value))
    }
}

/// An extension trait for adding context to errors.
pub trait ResultExt<T, E> {
    /// Wrap an error with a static context string.
    fn context(self, msg: &'static str) -> Result<T>;

    /// Wrap an error with a context string generated from a function.
    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(QuiverError::with_source(msg, Box::new(e))),
        }
    }

    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(QuiverError::with_source(f(), Box::new(e))),
        }
    }
}

pub trait OptionExt<T> {
    /// Return an error if the option is None.
    fn required(self, msg: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, msg: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(QuiverError::new(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "inner failure")
        }
    }

    impl Error for Inner {}

    #[test]
    fn display_with_fields_and_source() {
        let err: Result<()> = Err(Inner).context("outer");
        let err = err.unwrap_err().with_field("index", 4);

        let s = err.to_string();
        assert!(s.starts_with("outer [index: 4]"), "{s}");
        assert!(s.contains("inner failure"), "{s}");
        assert_eq!(Some("4"), err.get_field("index"));
        assert!(err.source().is_some());
    }

    #[test]
    fn option_required() {
        let v: Option<u8> = None;
        let err = v.required("missing value").unwrap_err();
        assert_eq!("missing value", err.get_msg());
    }

    fn not_impl() -> Result<()> {
        not_implemented!("thing {}", 3)
    }

    #[test]
    fn not_implemented_macro() {
        let err = not_impl().unwrap_err();
        assert_eq!("Not yet implemented: thing 3", err.get_msg());
    }
}
