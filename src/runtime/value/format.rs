//! Text forms of immediate values

/// Ruby's float notation: `1.0`, `0.30000000000000004`, `1.0e+20`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let abs = value.abs();
    if !(1e-4..1e16).contains(&abs) {
        let text = format!("{:e}", value);
        let (mantissa, exponent) = text.split_once('e').unwrap_or((&text, "0"));
        let mantissa = if mantissa.contains('.') {
            mantissa.to_string()
        } else {
            format!("{}.0", mantissa)
        };
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        return format!("{}e{}{:0>2}", mantissa, sign, digits);
    }
    let text = format!("{}", value);
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Double-quoted, escaped form of a string
pub fn inspect_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\x1b' => out.push_str("\\e"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            '#' if matches!(chars.peek(), Some('{' | '$' | '@')) => out.push_str("\\#"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

const OPERATOR_SYMBOLS: &[&str] = &[
    "+", "-", "*", "/", "%", "**", "==", "===", "!=", "=~", "!~", "<", ">", "<=", ">=", "<=>",
    "<<", ">>", "&", "|", "^", "~", "!", "[]", "[]=", "+@", "-@",
];

/// `:name`, or `:"..."` when the name is not a plain identifier.
pub fn inspect_sym(name: &str) -> String {
    if is_plain_symbol(name) {
        format!(":{}", name)
    } else {
        format!(":{}", inspect_str(name))
    }
}

fn is_plain_symbol(name: &str) -> bool {
    if OPERATOR_SYMBOLS.contains(&name) {
        return true;
    }
    let body = name
        .strip_prefix("@@")
        .or_else(|| name.strip_prefix('@'))
        .or_else(|| name.strip_prefix('$'))
        .unwrap_or(name);
    let body = body
        .strip_suffix(['?', '!', '='])
        .filter(|_| !name.starts_with(['@', '$']))
        .unwrap_or(body);
    let mut chars = body.chars();
    match chars.next() {
        Some(c) if c == '_' || unicode_ident::is_xid_start(c) => {
            chars.all(unicode_ident::is_xid_continue)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(1e20), "1.0e+20");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(f64::INFINITY), "Infinity");
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(format_float(-0.0), "-0.0");
    }

    #[test]
    fn test_inspect_str_escapes() {
        assert_eq!(inspect_str("hi"), "\"hi\"");
        assert_eq!(inspect_str("a\"b"), "\"a\\\"b\"");
        assert_eq!(inspect_str("a\nb\t"), "\"a\\nb\\t\"");
        assert_eq!(inspect_str("#{x}"), "\"\\#{x}\"");
        assert_eq!(inspect_str("#x"), "\"#x\"");
        assert_eq!(inspect_str("\0"), "\"\\u0000\"");
    }

    #[test]
    fn test_inspect_sym() {
        assert_eq!(inspect_sym("foo"), ":foo");
        assert_eq!(inspect_sym("empty?"), ":empty?");
        assert_eq!(inspect_sym("name="), ":name=");
        assert_eq!(inspect_sym("+"), ":+");
        assert_eq!(inspect_sym("[]="), ":[]=");
        assert_eq!(inspect_sym("@ivar"), ":@ivar");
        assert_eq!(inspect_sym("foo bar"), ":\"foo bar\"");
        assert_eq!(inspect_sym(""), ":\"\"");
    }
}
