// quote.rs — C string literal quoting helpers
//
// Used for aux metadata values and documentation strings embedded in the
// generated C++ sources.

use std::iter::Peekable;
use std::str::Chars;

/// Escape for the inside of a C string literal: backslash and double quote
/// get a backslash, `\n` `\r` `\t` their short escapes, and any other
/// control character a three-digit octal escape.
pub fn backslash_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\\' | '"' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Wrap `s` in double quotes as a C string literal.
pub fn cquote(s: &str) -> String {
    format!("\"{}\"", backslash_quote(s))
}

/// Decode the escape following a backslash. Octal escapes take up to three
/// digits. Returns `None` for an unrecognized escape.
fn unescape(chars: &mut Peekable<Chars<'_>>) -> Option<char> {
    let c = *chars.peek()?;
    let decoded = match c {
        '\\' | '"' | '\'' | '?' => c,
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '0'..='7' => {
            let mut value = 0u32;
            for _ in 0..3 {
                match chars.peek().and_then(|d| d.to_digit(8)) {
                    Some(d) => {
                        value = value * 8 + d;
                        chars.next();
                    }
                    None => break,
                }
            }
            return char::from_u32(value);
        }
        _ => return None,
    };
    chars.next();
    Some(decoded)
}

/// Inverse of [`cquote`]. Returns `None` unless `s` is enclosed in double
/// quotes. Unknown escapes are kept verbatim.
pub fn cunquote(s: &str) -> Option<String> {
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(decoded) = unescape(&mut chars) {
                out.push(decoded);
                continue;
            }
        }
        out.push(c);
    }
    Some(out)
}

/// Concatenate a chain of adjacent C string literals: `"foo" "bar"` → `foobar`.
/// Returns `None` for an unterminated literal, a dangling backslash, or text
/// other than whitespace between literals.
pub fn cunquote_chain(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut in_literal = false;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_literal = !in_literal,
            '\\' if in_literal => match unescape(&mut chars) {
                Some(decoded) => out.push(decoded),
                None => out.push(chars.next()?),
            },
            _ if in_literal => out.push(c),
            c if c.is_whitespace() => {}
            _ => return None,
        }
    }
    if in_literal {
        None
    } else {
        Some(out)
    }
}
