//! Decoding of Go literal tokens.

/// Decode an interpreted (`"..."`) or raw (`` `...` ``) string literal.
pub fn unquote(lit: &str) -> Option<String> {
    if let Some(raw) = lit.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return Some(raw.replace('\r', ""));
    }
    let inner = lit.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut bytes = Vec::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            flush_bytes(&mut bytes, &mut out);
            out.push(c);
            continue;
        }
        match unescape(&mut chars, '"')? {
            Escaped::Char(c) => {
                flush_bytes(&mut bytes, &mut out);
                out.push(c);
            }
            Escaped::Byte(b) => bytes.push(b),
        }
    }
    flush_bytes(&mut bytes, &mut out);
    Some(out)
}

/// Decode a rune literal (`'a'`, `'\n'`, `'é'`) to its code point.
pub fn unquote_rune(lit: &str) -> Option<u32> {
    let inner = lit.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars().peekable();
    let value = match chars.next()? {
        '\\' => match unescape(&mut chars, '\'')? {
            Escaped::Char(c) => c as u32,
            Escaped::Byte(b) => b as u32,
        },
        c => c as u32,
    };
    chars.next().is_none().then_some(value)
}

/// Parse an integer literal with Go's prefixes and digit separators.
pub fn parse_int(lit: &str) -> Option<i128> {
    let cleaned: String = lit.chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };
    i128::from_str_radix(digits, radix).ok()
}

/// Parse a decimal floating-point literal. Hexadecimal floats yield `None`.
pub fn parse_float(lit: &str) -> Option<f64> {
    let cleaned: String = lit.chars().filter(|c| *c != '_').collect();
    if cleaned.starts_with("0x") || cleaned.starts_with("0X") {
        return None;
    }
    cleaned.parse().ok()
}

enum Escaped {
    Char(char),
    Byte(u8),
}

fn flush_bytes(bytes: &mut Vec<u8>, out: &mut String) {
    if !bytes.is_empty() {
        out.push_str(&String::from_utf8_lossy(bytes));
        bytes.clear();
    }
}

fn unescape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
) -> Option<Escaped> {
    let c = chars.next()?;
    let simple = match c {
        'a' => Some('\x07'),
        'b' => Some('\x08'),
        'f' => Some('\x0c'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\x0b'),
        '\\' => Some('\\'),
        c if c == quote => Some(c),
        _ => None,
    };
    if let Some(c) = simple {
        return Some(Escaped::Char(c));
    }
    match c {
        'x' => {
            let hex: String = chars.by_ref().take(2).collect();
            u8::from_str_radix(&hex, 16).ok().map(Escaped::Byte)
        }
        'u' | 'U' => {
            let len = if c == 'u' { 4 } else { 8 };
            let hex: String = chars.by_ref().take(len).collect();
            let code = u32::from_str_radix(&hex, 16).ok()?;
            char::from_u32(code).map(Escaped::Char)
        }
        '0'..='7' => {
            let mut oct = String::from(c);
            oct.extend(chars.by_ref().take(2));
            u8::from_str_radix(&oct, 8).ok().map(Escaped::Byte)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpreted_strings() {
        assert_eq!(unquote(r#""fmt""#).as_deref(), Some("fmt"));
        assert_eq!(unquote(r#""a\tb\n""#).as_deref(), Some("a\tb\n"));
        assert_eq!(unquote(r#""é\x41""#).as_deref(), Some("éA"));
        assert_eq!(unquote(r#""\xc3\xa9""#).as_deref(), Some("é"));
        assert_eq!(unquote(r#""\q""#), None);
    }

    #[test]
    fn raw_strings_drop_carriage_returns() {
        assert_eq!(unquote("`a\r\nb`").as_deref(), Some("a\nb"));
    }

    #[test]
    fn runes() {
        assert_eq!(unquote_rune("'a'"), Some('a' as u32));
        assert_eq!(unquote_rune(r"'\n'"), Some(10));
        assert_eq!(unquote_rune(r"'\''"), Some(39));
        assert_eq!(unquote_rune("'ab'"), None);
    }

    #[test]
    fn integers() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x_FF"), Some(255));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("017"), Some(15));
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_int("0"), Some(0));
    }

    #[test]
    fn floats() {
        assert_eq!(parse_float("1.5"), Some(1.5));
        assert_eq!(parse_float("1e3"), Some(1000.0));
        assert_eq!(parse_float("0x1p-2"), None);
    }
}
