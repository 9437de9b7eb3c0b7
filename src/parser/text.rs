use std::borrow::Cow;

/// Reverse the escaping of ICS `TEXT` values.
///
/// Two-character sequences are consumed atomically in a single pass, so an escaped backslash
/// never combines with the character after it: `\\n` yields a backslash followed by `n`.
/// Unknown escapes and a trailing lone backslash are kept verbatim.
pub fn unescape_text(input: &str) -> Cow<'_, str> {
    if !input.contains('\\') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(',') => out.push(','),
            Some(';') => out.push(';'),
            Some('n' | 'N') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Cow::Owned(out)
}
