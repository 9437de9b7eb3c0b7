//! Split the logical lines of `LineReader` into parts.
//!
//! A content line is made of:
//! - A name formatted in uppercase.
//! - An optional list of parameters represented by `(key, values)` tuples. The key is
//!   formatted in uppercase and the values stay untouched (surrounding quotes removed).
//! - A value that stays untouched.
//!
//! The name and parameters end at the first colon that is not inside a quoted parameter
//! value, so values containing colons (URLs, times) are kept intact.
//!
//! #### Warning
//!   `ContentLineParser` only splits the line. No checks are made on the fields validity.
//!
//! # Examples
//!
//! ```rust
//! let mut reader = opencal::ContentLineParser::from_text(
//!     "DTSTART;TZID=Europe/Paris:20240115T090000\r\nURL:https://example.com/a\r\n",
//! );
//!
//! let dtstart = reader.next().unwrap().unwrap();
//! assert_eq!(dtstart.name, "DTSTART");
//! assert_eq!(dtstart.params.get_tzid(), Some("Europe/Paris"));
//! assert_eq!(dtstart.value, "20240115T090000");
//!
//! let url = reader.next().unwrap().unwrap();
//! assert_eq!(url.value, "https://example.com/a");
//! ```

use derive_more::From;
use std::fmt;
use std::iter::Iterator;

use super::{Line, LineReader};
use crate::{PARAM_DELIMITER, PARAM_NAME_DELIMITER, PARAM_QUOTE, PARAM_VALUE_DELIMITER, VALUE_DELIMITER};

/// Error arising when trying to parse a content line
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContentLineError {
    #[error("Line {0}: Missing property name.")]
    MissingName(usize),
    #[error("Line {0}: Missing a closing quote.")]
    MissingClosingQuote(usize),
    #[error("Line {0}: Missing a \"{1}\" delimiter.")]
    MissingDelimiter(usize, char),
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, From)]
pub struct ContentLineParams(pub(crate) Vec<(String, Vec<String>)>);

impl ContentLineParams {
    #[inline]
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| name == key)
            .and_then(|(_, value)| value.iter().map(String::as_ref).next())
    }

    #[inline]
    pub fn get_tzid(&self) -> Option<&str> {
        self.get_param("TZID")
    }

    #[inline]
    pub fn get_value_type(&self) -> Option<&str> {
        self.get_param("VALUE")
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An ICS property line.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct ContentLine {
    /// Property name.
    pub name: String,
    /// Parameter text between the name and the value delimiter, without the leading `;`.
    pub raw_params: String,
    /// Property list of parameters.
    pub params: ContentLineParams,
    /// Property value, possibly empty.
    pub value: String,
}

impl fmt::Display for ContentLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "name: {}\nparams: {:?}\nvalue: {:?}",
            self.name, self.params, self.value
        )
    }
}

/// Position of the first `delimiter` of `input` outside double quotes.
fn find_unquoted(input: &str, delimiter: char) -> Result<Option<usize>, ()> {
    let mut quoted = false;
    for (pos, c) in input.char_indices() {
        match c {
            PARAM_QUOTE => quoted = !quoted,
            c if c == delimiter && !quoted => return Ok(Some(pos)),
            _ => {}
        }
    }
    if quoted { Err(()) } else { Ok(None) }
}

/// Split `input` on every `delimiter` outside double quotes.
fn split_unquoted(input: &str, delimiter: char) -> Vec<&str> {
    let mut parts = vec![];
    let mut quoted = false;
    let mut start = 0;
    for (pos, c) in input.char_indices() {
        match c {
            PARAM_QUOTE => quoted = !quoted,
            c if c == delimiter && !quoted => {
                parts.push(&input[start..pos]);
                start = pos + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn parse_params(raw: &str) -> ContentLineParams {
    split_unquoted(raw, PARAM_DELIMITER)
        .into_iter()
        .filter(|param| !param.is_empty())
        .map(|param| match param.split_once(PARAM_NAME_DELIMITER) {
            Some((key, values)) => (
                key.to_uppercase(),
                split_unquoted(values, PARAM_VALUE_DELIMITER)
                    .into_iter()
                    .map(|value| value.trim_matches(PARAM_QUOTE).to_owned())
                    .collect(),
            ),
            // Tolerate a bare parameter instead of rejecting the whole line
            None => (param.to_uppercase(), vec![]),
        })
        .collect::<Vec<_>>()
        .into()
}

pub struct ContentLineParser<'a>(LineReader<'a>);

impl<'a> ContentLineParser<'a> {
    pub fn from_text(text: &'a str) -> Self {
        ContentLineParser(LineReader::from_text(text))
    }

    pub fn new(line_reader: LineReader<'a>) -> Self {
        ContentLineParser(line_reader)
    }

    fn parse(&self, line: Line) -> Result<ContentLine, ContentLineError> {
        let to_parse = line.as_str();

        // Find end of property name
        let Some(name_end) = to_parse.find([PARAM_DELIMITER, VALUE_DELIMITER]) else {
            return Err(ContentLineError::MissingDelimiter(
                line.number(),
                VALUE_DELIMITER,
            ));
        };
        let (prop_name, remainder) = to_parse.split_at(name_end);
        let prop_name = prop_name.trim();
        if prop_name.is_empty() {
            return Err(ContentLineError::MissingName(line.number()));
        }

        // remainder either starts with ; or :
        let (raw_params, value) = if let Some(params) = remainder.strip_prefix(PARAM_DELIMITER) {
            let value_pos = match find_unquoted(params, VALUE_DELIMITER) {
                Ok(pos) => pos.ok_or(ContentLineError::MissingDelimiter(
                    line.number(),
                    VALUE_DELIMITER,
                ))?,
                // A quote that never closes cannot hide the delimiter
                Err(()) => params
                    .find(VALUE_DELIMITER)
                    .ok_or(ContentLineError::MissingClosingQuote(line.number()))?,
            };
            (&params[..value_pos], &params[value_pos + 1..])
        } else {
            ("", &remainder[1..])
        };

        Ok(ContentLine {
            name: prop_name.to_uppercase(),
            raw_params: raw_params.to_owned(),
            params: parse_params(raw_params),
            value: value.to_owned(),
        })
    }
}

impl<'a> Iterator for ContentLineParser<'a> {
    type Item = Result<ContentLine, ContentLineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.0.next()?;
        Some(self.parse(line))
    }
}
