//! Undo the line folding of ICS text.
//!
//! A line break followed by a single space or horizontal tab is a continuation: the break and
//! the fold marker are removed and the remainder joins the previous line. Both CRLF and bare LF
//! line endings are accepted.

use std::borrow::Cow;
use std::fmt;
use std::iter::{Enumerate, Peekable};
use std::str::Lines;

const FOLD_MARKERS: [char; 2] = [' ', '\t'];

/// Collapse every folded continuation of `input` into its logical line.
///
/// The input is borrowed untouched when it contains no fold.
///
/// ```rust
/// assert_eq!(opencal::parser::unfold("SUMMARY:Long\r\n  Title"), "SUMMARY:Long Title");
/// assert_eq!(opencal::parser::unfold("A\n\tB\nC"), "AB\nC");
/// ```
pub fn unfold(input: &str) -> Cow<'_, str> {
    if !input.contains("\n ") && !input.contains("\n\t") {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('\n') {
        let (head, tail) = (&rest[..pos], &rest[pos + 1..]);
        if tail.starts_with(FOLD_MARKERS) {
            out.push_str(head.strip_suffix('\r').unwrap_or(head));
            // Fold markers are single-byte
            rest = &tail[1..];
        } else {
            out.push_str(&rest[..=pos]);
            rest = tail;
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// One logical (unfolded) line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    pub inner: Cow<'a, str>,
    number: usize,
}

impl<'a> Line<'a> {
    pub fn new(inner: Cow<'a, str>, number: usize) -> Self {
        Self { inner, number }
    }

    /// Physical line number (1-based) where this logical line starts.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.number, self.inner)
    }
}

/// Iterator over the logical lines of ICS text.
///
/// Blank lines are skipped. Lines without continuation are borrowed from the input.
pub struct LineReader<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
}

impl<'a> LineReader<'a> {
    pub fn from_text(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate().peekable(),
        }
    }
}

impl<'a> Iterator for LineReader<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (idx, first) = self.lines.next()?;
            let mut line = Cow::Borrowed(first.trim_end_matches('\r'));

            while let Some((_, continuation)) = self.lines.next_if(|(_, l)| l.starts_with(FOLD_MARKERS)) {
                let continuation = continuation.trim_end_matches('\r');
                line.to_mut().push_str(&continuation[1..]);
            }

            if line.is_empty() {
                continue;
            }
            return Some(Line::new(line, idx + 1));
        }
    }
}
