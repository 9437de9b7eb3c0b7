use crate::{parser::ContentLineError, types::CalDateTimeError};

/// Reason an event block was dropped.
///
/// These never escape [`crate::parse`]; they only end up in debug logs.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("incomplete object")]
    NotComplete,
    #[error("content line error: {0}")]
    ContentLineError(#[from] ContentLineError),
    #[error("missing property: {0}")]
    MissingProperty(&'static str),
    #[error(transparent)]
    DateTime(#[from] CalDateTimeError),
}
