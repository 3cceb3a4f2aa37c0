//! String and Symbol
//!
//! Strings are mutable and shared (`Rc<RefCell<String>>`); indexes are
//! character indexes. Pattern methods accept a `Regexp` or a string
//! matched literally.

use super::kernel::parse_integer;
use super::range::{clamp_slice, range_slice};
use super::regexp::{self, byte_index, char_index, expand_replacement, record_match};
use super::{arg, expect_int, expect_str};
use crate::runtime::class::CoreClasses;
use crate::runtime::interpreter::{EvalResult, Exec};
use crate::runtime::value::{inspect_str, inspect_sym, Args, Value};
use smallvec::smallvec;
use std::cell::RefCell;
use std::rc::Rc;

/// Longest string a builtin will build, in bytes
pub const MAX_STRING: i64 = super::range::MAX_ITEMS * 16;

pub fn register(core: &CoreClasses) {
    let string = &core.string;
    string.define_singleton_native("new", str_new);
    string.define_native("initialize", |_, _, _, _| Ok(Value::Nil));
    string.define_native("==", str_eq);
    string.define_native("eql?", str_eq);
    string.define_native("===", str_eq);
    string.define_native("<=>", str_cmp);
    string.define_native("<", |exec, recv, args, _| str_order(exec, recv, &args, |o| o.is_lt()));
    string.define_native(">", |exec, recv, args, _| str_order(exec, recv, &args, |o| o.is_gt()));
    string.define_native("<=", |exec, recv, args, _| str_order(exec, recv, &args, |o| o.is_le()));
    string.define_native(">=", |exec, recv, args, _| str_order(exec, recv, &args, |o| o.is_ge()));
    string.define_native("+", str_plus);
    string.define_native("*", str_times);
    string.define_native("%", str_format);
    string.define_native("=~", str_match_op);
    string.define_native("match", str_match);
    string.define_native("match?", str_match_p);
    string.define_native("length", |_, recv, _, _| Ok(Value::Int(text_of(recv).chars().count() as i64)));
    string.define_native("size", |_, recv, _, _| Ok(Value::Int(text_of(recv).chars().count() as i64)));
    string.define_native("bytesize", |_, recv, _, _| Ok(Value::Int(text_of(recv).len() as i64)));
    string.define_native("empty?", |_, recv, _, _| Ok(Value::Bool(text_of(recv).is_empty())));
    string.define_native("[]", str_aref);
    string.define_native("slice", str_aref);
    string.define_native("[]=", str_aset);
    string.define_native("to_s", |_, recv, _, _| Ok(recv.clone()));
    string.define_native("to_str", |_, recv, _, _| Ok(recv.clone()));
    string.define_native("inspect", |_, recv, _, _| Ok(Value::str(inspect_str(&text_of(recv)))));
    string.define_native("to_sym", |_, recv, _, _| Ok(Value::sym(&text_of(recv))));
    string.define_native("intern", |_, recv, _, _| Ok(Value::sym(&text_of(recv))));
    string.define_native("to_i", str_to_i);
    string.define_native("to_f", |_, recv, _, _| Ok(Value::Float(leading_float(&text_of(recv)))));
    string.define_native("hex", |_, recv, _, _| Ok(Value::Int(leading_int(&text_of(recv), 16))));
    string.define_native("ord", str_ord);
    string.define_native("succ", |_, recv, _, _| Ok(Value::str(succ(&text_of(recv)))));
    string.define_native("next", |_, recv, _, _| Ok(Value::str(succ(&text_of(recv)))));
    string.define_native("frozen?", |_, _, _, _| Ok(Value::Bool(false)));

    string.define_native("upcase", |exec, recv, _, _| transform(exec, recv, false, |s| s.to_uppercase()));
    string.define_native("upcase!", |exec, recv, _, _| transform(exec, recv, true, |s| s.to_uppercase()));
    string.define_native("downcase", |exec, recv, _, _| transform(exec, recv, false, |s| s.to_lowercase()));
    string.define_native("downcase!", |exec, recv, _, _| transform(exec, recv, true, |s| s.to_lowercase()));
    string.define_native("capitalize", |exec, recv, _, _| transform(exec, recv, false, capitalize));
    string.define_native("capitalize!", |exec, recv, _, _| transform(exec, recv, true, capitalize));
    string.define_native("swapcase", |exec, recv, _, _| transform(exec, recv, false, swapcase));
    string.define_native("swapcase!", |exec, recv, _, _| transform(exec, recv, true, swapcase));
    string.define_native("strip", |exec, recv, _, _| transform(exec, recv, false, |s| s.trim_matches(is_space).to_string()));
    string.define_native("strip!", |exec, recv, _, _| transform(exec, recv, true, |s| s.trim_matches(is_space).to_string()));
    string.define_native("lstrip", |exec, recv, _, _| transform(exec, recv, false, |s| s.trim_start_matches(is_space).to_string()));
    string.define_native("lstrip!", |exec, recv, _, _| transform(exec, recv, true, |s| s.trim_start_matches(is_space).to_string()));
    string.define_native("rstrip", |exec, recv, _, _| transform(exec, recv, false, |s| s.trim_end_matches(is_space).to_string()));
    string.define_native("rstrip!", |exec, recv, _, _| transform(exec, recv, true, |s| s.trim_end_matches(is_space).to_string()));
    string.define_native("reverse", |exec, recv, _, _| transform(exec, recv, false, |s| s.chars().rev().collect()));
    string.define_native("reverse!", |exec, recv, _, _| {
        transform(exec, recv, true, |s| s.chars().rev().collect())?;
        Ok(recv.clone())
    });
    string.define_native("chop", |exec, recv, _, _| transform(exec, recv, false, chop));
    string.define_native("chomp", str_chomp);
    string.define_native("chomp!", str_chomp_bang);
    string.define_native("delete_prefix", str_delete_prefix);
    string.define_native("delete_suffix", str_delete_suffix);

    string.define_native("chars", |_, recv, _, _| {
        Ok(Value::array(text_of(recv).chars().map(|c| Value::str(c.to_string())).collect()))
    });
    string.define_native("bytes", |_, recv, _, _| {
        Ok(Value::array(text_of(recv).bytes().map(|b| Value::Int(i64::from(b))).collect()))
    });
    string.define_native("lines", |_, recv, _, _| {
        Ok(Value::array(text_of(recv).split_inclusive('\n').map(Value::str).collect()))
    });
    string.define_native("each_char", str_each_char);
    string.define_native("each_line", str_each_line);
    string.define_native("split", str_split);
    string.define_native("partition", |exec, recv, args, _| str_partition(exec, recv, &args, false));
    string.define_native("rpartition", |exec, recv, args, _| str_partition(exec, recv, &args, true));
    string.define_native("include?", str_include);
    string.define_native("start_with?", str_start_with);
    string.define_native("end_with?", str_end_with);
    string.define_native("index", str_index);
    string.define_native("rindex", str_rindex);
    string.define_native("casecmp", str_casecmp);
    string.define_native("casecmp?", str_casecmp_p);

    string.define_native("<<", str_append);
    string.define_native("concat", str_append);
    string.define_native("replace", str_replace);
    string.define_native("insert", str_insert);
    string.define_native("prepend", str_prepend);
    string.define_native("clear", |_, recv, _, _| {
        str_cell(recv).borrow_mut().clear();
        Ok(recv.clone())
    });

    string.define_native("sub", |exec, recv, args, block| substitute(exec, recv, args, block, false, false));
    string.define_native("sub!", |exec, recv, args, block| substitute(exec, recv, args, block, false, true));
    string.define_native("gsub", |exec, recv, args, block| substitute(exec, recv, args, block, true, false));
    string.define_native("gsub!", |exec, recv, args, block| substitute(exec, recv, args, block, true, true));
    string.define_native("scan", str_scan);
    string.define_native("tr", str_tr);
    string.define_native("delete", str_delete);
    string.define_native("squeeze", str_squeeze);
    string.define_native("count", str_count);
    string.define_native("center", |exec, recv, args, _| justify(exec, recv, &args, Justify::Center));
    string.define_native("ljust", |exec, recv, args, _| justify(exec, recv, &args, Justify::Left));
    string.define_native("rjust", |exec, recv, args, _| justify(exec, recv, &args, Justify::Right));

    let symbol = &core.symbol;
    symbol.define_native("to_s", |_, recv, _, _| Ok(Value::str(text_of(recv))));
    symbol.define_native("id2name", |_, recv, _, _| Ok(Value::str(text_of(recv))));
    symbol.define_native("name", |_, recv, _, _| Ok(Value::str(text_of(recv))));
    symbol.define_native("to_sym", |_, recv, _, _| Ok(recv.clone()));
    symbol.define_native("inspect", |_, recv, _, _| Ok(Value::str(inspect_sym(&text_of(recv)))));
    symbol.define_native("to_proc", sym_to_proc);
    symbol.define_native("length", |_, recv, _, _| Ok(Value::Int(text_of(recv).chars().count() as i64)));
    symbol.define_native("size", |_, recv, _, _| Ok(Value::Int(text_of(recv).chars().count() as i64)));
    symbol.define_native("empty?", |_, recv, _, _| Ok(Value::Bool(text_of(recv).is_empty())));
    symbol.define_native("upcase", |_, recv, _, _| Ok(Value::sym(&text_of(recv).to_uppercase())));
    symbol.define_native("downcase", |_, recv, _, _| Ok(Value::sym(&text_of(recv).to_lowercase())));
    symbol.define_native("capitalize", |_, recv, _, _| Ok(Value::sym(&capitalize(&text_of(recv)))));
    symbol.define_native("succ", |_, recv, _, _| Ok(Value::sym(&succ(&text_of(recv)))));
    symbol.define_native("<=>", |exec, recv, args, _| {
        exec.check_args(args.len(), 1, Some(1))?;
        Ok(match &args[0] {
            Value::Sym(_) => exec.compare(recv, &args[0])?.map(super::numeric::ordering_value).unwrap_or_default(),
            _ => Value::Nil,
        })
    });
    symbol.define_native("[]", |exec, recv, args, block| {
        let text = Value::str(text_of(recv));
        str_aref(exec, &text, args, block)
    });
    symbol.define_native("start_with?", |exec, recv, args, block| {
        let text = Value::str(text_of(recv));
        str_start_with(exec, &text, args, block)
    });
    symbol.define_native("end_with?", |exec, recv, args, block| {
        let text = Value::str(text_of(recv));
        str_end_with(exec, &text, args, block)
    });
}

// =============================================================================
// Helpers
// =============================================================================

/// Copy of the receiver's text; symbols give their name.
fn text_of(value: &Value) -> String {
    match value {
        Value::Str(text) => text.borrow().clone(),
        Value::Sym(name) => name.to_string(),
        _ => String::new(),
    }
}

fn str_cell(value: &Value) -> Rc<RefCell<String>> {
    match value {
        Value::Str(text) => text.clone(),
        _ => Rc::new(RefCell::new(String::new())),
    }
}

fn is_space(c: char) -> bool {
    c.is_whitespace() || c == '\0'
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

fn swapcase(text: &str) -> String {
    text.chars()
        .flat_map(|c| {
            if c.is_uppercase() {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                c.to_uppercase().collect::<Vec<_>>()
            }
        })
        .collect()
}

fn chop(text: &str) -> String {
    if let Some(rest) = text.strip_suffix("\r\n") {
        return rest.to_string();
    }
    let mut chars = text.chars();
    chars.next_back();
    chars.as_str().to_string()
}

fn chomp(text: &str) -> String {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .or_else(|| text.strip_suffix('\r'))
        .unwrap_or(text)
        .to_string()
}

/// Copy or in-place variant of a text transformation. In place returns
/// `nil` when nothing changed.
fn transform(
    _exec: &mut Exec<'_>,
    recv: &Value,
    in_place: bool,
    f: fn(&str) -> String,
) -> EvalResult<Value> {
    let original = text_of(recv);
    let changed = f(&original);
    if !in_place {
        return Ok(Value::str(changed));
    }
    if changed == original {
        return Ok(Value::Nil);
    }
    *str_cell(recv).borrow_mut() = changed;
    Ok(recv.clone())
}

/// Ruby's `String#succ`: increment the rightmost alphanumeric, carrying
/// leftwards; a final carry grows the string.
pub fn succ(text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    let alnum: Vec<usize> = chars
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_ascii_alphanumeric())
        .map(|(i, _)| i)
        .collect();
    let Some(&first) = alnum.first() else {
        if let Some(last) = chars.last_mut() {
            *last = char::from_u32(*last as u32 + 1).unwrap_or(*last);
        }
        return chars.into_iter().collect();
    };
    for &i in alnum.iter().rev() {
        let (next, carry) = match chars[i] {
            'z' => ('a', true),
            'Z' => ('A', true),
            '9' => ('0', true),
            c => (char::from_u32(c as u32 + 1).unwrap_or(c), false),
        };
        chars[i] = next;
        if !carry {
            return chars.into_iter().collect();
        }
    }
    let grown = match chars[first] {
        'a' => 'a',
        'A' => 'A',
        _ => '1',
    };
    chars.insert(first, grown);
    chars.into_iter().collect()
}

/// Leading integer in `base`, ignoring the rest; 0 when there is none.
fn leading_int(
    text: &str,
    base: u32,
) -> i64 {
    let trimmed = text.trim_start();
    let (negative, body) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let body = match base {
        16 => body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")).unwrap_or(body),
        2 => body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")).unwrap_or(body),
        _ => body,
    };
    let mut value: i64 = 0;
    let mut previous_underscore = true;
    for c in body.chars() {
        if c == '_' && !previous_underscore {
            previous_underscore = true;
            continue;
        }
        let Some(digit) = c.to_digit(base) else {
            break;
        };
        previous_underscore = false;
        value = value.saturating_mul(i64::from(base)).saturating_add(i64::from(digit));
    }
    if negative {
        -value
    } else {
        value
    }
}

/// Longest float prefix, 0.0 when there is none.
fn leading_float(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    let mut best = 0.0;
    while end < bytes.len() {
        end += 1;
        let candidate: String = trimmed[..end].chars().filter(|c| *c != '_').collect();
        if let Ok(value) = candidate.parse::<f64>() {
            if !candidate.ends_with(['e', 'E', '.']) && !candidate.contains("inf") {
                best = value;
            }
        } else if !matches!(bytes[end - 1], b'e' | b'E' | b'-' | b'+' | b'.' | b'_') {
            break;
        }
    }
    best
}

/// A `tr`-style character set: `a-z` ranges, `^` negation.
struct CharSet {
    negate: bool,
    chars: Vec<char>,
}

impl CharSet {
    fn parse(spec: &str) -> Self {
        let raw: Vec<char> = spec.chars().collect();
        let (negate, raw) = match raw.split_first() {
            Some(('^', rest)) if !rest.is_empty() => (true, rest),
            _ => (false, &raw[..]),
        };
        CharSet {
            negate,
            chars: expand_set(raw),
        }
    }

    fn contains(
        &self,
        c: char,
    ) -> bool {
        self.chars.contains(&c) != self.negate
    }
}

fn expand_set(raw: &[char]) -> Vec<char> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        if i + 2 < raw.len() && raw[i + 1] == '-' && raw[i] <= raw[i + 2] {
            out.extend(raw[i]..=raw[i + 2]);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    out
}

// =============================================================================
// Comparison and operators
// =============================================================================

fn str_new(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    match args.first() {
        Some(text) => Ok(Value::str(expect_str(exec, text)?)),
        None => Ok(Value::str("")),
    }
}

fn str_eq(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    Ok(Value::Bool(match &args[0] {
        Value::Str(other) => text_of(recv) == *other.borrow(),
        _ => false,
    }))
}

fn str_cmp(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    Ok(match &args[0] {
        Value::Str(other) => {
            super::numeric::ordering_value(text_of(recv).as_str().cmp(other.borrow().as_str()))
        }
        _ => Value::Nil,
    })
}

fn str_order(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    test: fn(std::cmp::Ordering) -> bool,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    Ok(Value::Bool(test(exec.compare_strict(recv, &args[0])?)))
}

fn str_plus(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let other = expect_str(exec, &args[0])?;
    Ok(Value::str(text_of(recv) + &other))
}

fn str_times(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let count = expect_int(exec, &args[0])?;
    if count < 0 {
        return exec.raise("ArgumentError", "negative argument");
    }
    let text = text_of(recv);
    if (text.len() as i64).saturating_mul(count) > MAX_STRING {
        return exec.raise("ArgumentError", "argument too big");
    }
    Ok(Value::str(text.repeat(count as usize)))
}

fn str_format(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let values = match &args[0] {
        Value::Array(items) => items.borrow().clone(),
        other => vec![other.clone()],
    };
    Ok(Value::str(format(exec, &text_of(recv), &values)?))
}

// =============================================================================
// Matching
// =============================================================================

fn str_match_op(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    match &args[0] {
        Value::Regexp(re) => Ok(regexp::match_index(exec, re, &text_of(recv))),
        Value::Str(_) => exec.raise("TypeError", "wrong argument type String (expected Regexp)"),
        other => exec.call_method(other, "=~", smallvec![recv.clone()], None),
    }
}

fn str_match(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(2))?;
    let re = regexp::coerce(exec, &args[0])?;
    let mut rest: Args = smallvec![recv.clone()];
    rest.extend(args.into_iter().skip(1));
    exec.call_method(&Value::Regexp(re), "match", rest, block)
}

fn str_match_p(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let re = regexp::coerce(exec, &args[0])?;
    Ok(Value::Bool(re.regex.is_match(&text_of(recv))))
}

/// `sub`/`gsub` with a replacement string, a hash, or a block.
fn substitute(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
    global: bool,
    in_place: bool,
) -> EvalResult<Value> {
    let max = if block.is_some() { 1 } else { 2 };
    exec.check_args(args.len(), max, Some(max))?;
    let re = regexp::coerce(exec, &args[0])?;
    let text = text_of(recv);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut replaced = false;
    let mut start = 0;
    while start <= text.len() {
        let Some(caps) = re.regex.captures_at(&text, start) else {
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };
        replaced = true;
        out.push_str(&text[last..whole.start()]);
        let replacement = match (args.get(1), &block) {
            (Some(Value::Hash(hash)), _) => {
                let value = hash.borrow().get(&Value::str(whole.as_str())).cloned();
                exec.to_s(&value.unwrap_or_default())?
            }
            (Some(template), _) => {
                let template = expect_str(exec, template)?;
                expand_replacement(&template, &caps)
            }
            (None, Some(block)) => {
                let matched = Value::str(whole.as_str());
                record_match(exec, &re, &text, &caps);
                let value = exec.call_block(block, smallvec![matched])?;
                exec.to_s(&value)?
            }
            (None, None) => String::new(),
        };
        out.push_str(&replacement);
        last = whole.end();
        if !global {
            break;
        }
        start = if whole.end() == whole.start() {
            // step over one character after an empty match
            match text[whole.end()..].chars().next() {
                Some(c) => {
                    out.push(c);
                    last = whole.end() + c.len_utf8();
                    last
                }
                None => text.len() + 1,
            }
        } else {
            whole.end()
        };
    }
    if last <= text.len() {
        out.push_str(&text[last..]);
    }
    if !in_place {
        return Ok(Value::str(out));
    }
    if !replaced {
        return Ok(Value::Nil);
    }
    *str_cell(recv).borrow_mut() = out;
    Ok(recv.clone())
}

fn str_scan(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let re = regexp::coerce(exec, &args[0])?;
    let text = text_of(recv);
    let mut found = Vec::new();
    for caps in re.regex.captures_iter(&text) {
        let item = if caps.len() > 1 {
            Value::array(
                caps.iter()
                    .skip(1)
                    .map(|group| group.map(|m| Value::str(m.as_str())).unwrap_or_default())
                    .collect(),
            )
        } else {
            Value::str(caps.get(0).map_or("", |m| m.as_str()))
        };
        if let Some(block) = &block {
            record_match(exec, &re, &text, &caps);
            exec.call_block(block, smallvec![item])?;
        } else {
            found.push(item);
        }
    }
    match block {
        Some(_) => Ok(recv.clone()),
        None => Ok(Value::array(found)),
    }
}

// =============================================================================
// Indexing
// =============================================================================

fn chars_value(chars: &[char]) -> Value {
    Value::str(chars.iter().collect::<String>())
}

fn str_aref(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(2))?;
    let text = text_of(recv);
    let chars: Vec<char> = text.chars().collect();
    match (&args[0], args.get(1)) {
        (Value::Int(i), None) => Ok(match clamp_slice(chars.len(), *i, 1) {
            Some((start, 1)) => chars_value(&chars[start..=start]),
            _ => Value::Nil,
        }),
        (Value::Int(i), Some(len)) => {
            let len = expect_int(exec, len)?;
            Ok(match clamp_slice(chars.len(), *i, len) {
                Some((start, count)) => chars_value(&chars[start..start + count]),
                None => Value::Nil,
            })
        }
        (Value::Range(r), None) => Ok(match range_slice(exec, r, chars.len())? {
            Some((start, count)) => chars_value(&chars[start..start + count]),
            None => Value::Nil,
        }),
        (Value::Str(sub), None) => {
            let sub = sub.borrow().clone();
            Ok(if text.contains(&sub) { Value::str(sub) } else { Value::Nil })
        }
        (Value::Regexp(re), group) => {
            let data = regexp::search(exec, re, &text, 0);
            if data.is_nil() {
                return Ok(Value::Nil);
            }
            let group = group.cloned().unwrap_or(Value::Int(0));
            exec.call_method(&data, "[]", smallvec![group], None)
        }
        (other, _) => expect_int(exec, other).map(|_| Value::Nil),
    }
}

fn str_aset(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 2, Some(3))?;
    let value = args[args.len() - 1].clone();
    let replacement: Vec<char> = expect_str(exec, &value)?.chars().collect();
    let text = text_of(recv);
    let chars: Vec<char> = text.chars().collect();
    let (start, count) = match (&args[0], args.len()) {
        (Value::Int(i), 2) => match clamp_slice(chars.len(), *i, 1) {
            Some((start, 1)) => (start, 1),
            _ => return exec.raise("IndexError", format!("index {} out of string", i)),
        },
        (Value::Int(i), _) => {
            let len = expect_int(exec, &args[1])?;
            match clamp_slice(chars.len(), *i, len) {
                Some(slice) => slice,
                None => return exec.raise("IndexError", format!("index {} out of string", i)),
            }
        }
        (Value::Range(r), 2) => match range_slice(exec, r, chars.len())? {
            Some(slice) => slice,
            None => {
                let shown = exec.inspect_or_fallback(&args[0])?;
                return exec.raise("RangeError", format!("{} out of range", shown));
            }
        },
        (Value::Str(sub), 2) => {
            let sub = sub.borrow().clone();
            match text.find(&sub) {
                Some(byte) => (char_index(&text, byte), sub.chars().count()),
                None => return exec.raise("IndexError", "string not matched"),
            }
        }
        (Value::Regexp(re), 2) => match re.regex.find(&text) {
            Some(m) => {
                let start = char_index(&text, m.start());
                (start, char_index(&text, m.end()) - start)
            }
            None => return exec.raise("IndexError", "regexp not matched"),
        },
        (other, _) => {
            expect_int(exec, other)?;
            return Ok(value);
        }
    };
    let mut spliced = chars;
    spliced.splice(start..start + count, replacement);
    *str_cell(recv).borrow_mut() = spliced.into_iter().collect();
    Ok(value)
}

fn str_index(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(2))?;
    let text = text_of(recv);
    let len = text.chars().count() as i64;
    let from = match args.get(1) {
        Some(from) => expect_int(exec, from)?,
        None => 0,
    };
    let from = if from < 0 { from + len } else { from };
    if from < 0 || from > len {
        return Ok(Value::Nil);
    }
    let byte = byte_index(&text, from as usize);
    let found = match &args[0] {
        Value::Regexp(re) => re.regex.find_at(&text, byte).map(|m| m.start()),
        other => {
            let sub = expect_str(exec, other)?;
            text[byte..].find(&sub).map(|offset| byte + offset)
        }
    };
    Ok(found.map_or(Value::Nil, |byte| Value::Int(char_index(&text, byte) as i64)))
}

fn str_rindex(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(2))?;
    let text = text_of(recv);
    let sub = expect_str(exec, &args[0])?;
    let len = text.chars().count() as i64;
    let until = match args.get(1) {
        Some(until) => {
            let until = expect_int(exec, until)?;
            if until < 0 { until + len } else { until }
        }
        None => len,
    };
    if until < 0 {
        return Ok(Value::Nil);
    }
    let limit = byte_index(&text, until as usize);
    let end = (limit + sub.len()).min(text.len());
    let found = text.get(..end).and_then(|head| head.rfind(&sub));
    Ok(found.map_or(Value::Nil, |byte| Value::Int(char_index(&text, byte) as i64)))
}

// =============================================================================
// Queries and conversions
// =============================================================================

fn str_to_i(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let base = match args.first() {
        Some(base) => expect_int(exec, base)?,
        None => 10,
    };
    if !(2..=36).contains(&base) {
        return exec.raise("ArgumentError", format!("invalid radix {}", base));
    }
    Ok(Value::Int(leading_int(&text_of(recv), base as u32)))
}

fn str_ord(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    match text_of(recv).chars().next() {
        Some(c) => Ok(Value::Int(i64::from(u32::from(c)))),
        None => exec.raise("ArgumentError", "empty string"),
    }
}

fn str_include(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let sub = expect_str(exec, &args[0])?;
    Ok(Value::Bool(text_of(recv).contains(&sub)))
}

fn str_start_with(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let text = text_of(recv);
    for prefix in &args {
        let hit = match prefix {
            Value::Regexp(re) => re.regex.find(&text).is_some_and(|m| m.start() == 0),
            other => text.starts_with(&expect_str(exec, other)?),
        };
        if hit {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn str_end_with(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let text = text_of(recv);
    for suffix in &args {
        if text.ends_with(&expect_str(exec, suffix)?) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn str_casecmp(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let Value::Str(other) = &args[0] else {
        return Ok(Value::Nil);
    };
    let (a, b) = (text_of(recv).to_lowercase(), other.borrow().to_lowercase());
    Ok(super::numeric::ordering_value(a.cmp(&b)))
}

fn str_casecmp_p(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let Value::Str(other) = &args[0] else {
        return Ok(Value::Nil);
    };
    Ok(Value::Bool(text_of(recv).to_lowercase() == other.borrow().to_lowercase()))
}

fn str_chomp(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(1))?;
    let text = text_of(recv);
    match args.first() {
        Some(suffix) => {
            let suffix = expect_str(exec, suffix)?;
            Ok(Value::str(text.strip_suffix(suffix.as_str()).unwrap_or(&text)))
        }
        None => Ok(Value::str(chomp(&text))),
    }
}

fn str_chomp_bang(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let chomped = str_chomp(exec, recv, args, None)?;
    let chomped = text_of(&chomped);
    if chomped == text_of(recv) {
        return Ok(Value::Nil);
    }
    *str_cell(recv).borrow_mut() = chomped;
    Ok(recv.clone())
}

fn str_delete_prefix(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let prefix = expect_str(exec, &args[0])?;
    let text = text_of(recv);
    Ok(Value::str(text.strip_prefix(prefix.as_str()).unwrap_or(&text)))
}

fn str_delete_suffix(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let suffix = expect_str(exec, &args[0])?;
    let text = text_of(recv);
    Ok(Value::str(text.strip_suffix(suffix.as_str()).unwrap_or(&text)))
}

fn str_each_char(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let chars: Vec<Value> = text_of(recv).chars().map(|c| Value::str(c.to_string())).collect();
    let Some(block) = block else {
        return Ok(Value::array(chars));
    };
    for c in chars {
        exec.call_block(&block, smallvec![c])?;
    }
    Ok(recv.clone())
}

fn str_each_line(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let lines: Vec<Value> = text_of(recv).split_inclusive('\n').map(Value::str).collect();
    let Some(block) = block else {
        return Ok(Value::array(lines));
    };
    for line in lines {
        exec.call_block(&block, smallvec![line])?;
    }
    Ok(recv.clone())
}

/// `split` on whitespace (no pattern or `" "`), a string or a regexp.
/// Trailing empty fields are dropped unless a limit is given.
fn str_split(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(2))?;
    let text = text_of(recv);
    let limit = match args.get(1) {
        Some(limit) => expect_int(exec, limit)?,
        None => 0,
    };
    let pieces: Vec<String> = match arg(&args, 0) {
        Value::Nil => split_whitespace(&text, limit),
        Value::Str(sep) if *sep.borrow() == " " => split_whitespace(&text, limit),
        Value::Str(sep) => {
            let sep = sep.borrow().clone();
            if sep.is_empty() {
                let chars: Vec<String> = text.chars().map(String::from).collect();
                if limit > 0 && chars.len() > limit as usize {
                    let head = limit as usize - 1;
                    let mut out = chars[..head].to_vec();
                    out.push(chars[head..].concat());
                    out
                } else {
                    chars
                }
            } else if limit > 0 {
                text.splitn(limit as usize, sep.as_str()).map(String::from).collect()
            } else {
                text.split(sep.as_str()).map(String::from).collect()
            }
        }
        Value::Regexp(re) => {
            if limit > 0 {
                re.regex.splitn(&text, limit as usize).map(String::from).collect()
            } else {
                re.regex.split(&text).map(String::from).collect()
            }
        }
        other => {
            expect_str(exec, &other)?;
            Vec::new()
        }
    };
    let mut pieces = pieces;
    if limit == 0 {
        while pieces.last().is_some_and(String::is_empty) {
            pieces.pop();
        }
    }
    Ok(Value::array(pieces.into_iter().map(Value::str).collect()))
}

fn split_whitespace(
    text: &str,
    limit: i64,
) -> Vec<String> {
    if limit <= 0 {
        return text.split_whitespace().map(String::from).collect();
    }
    let mut out = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if out.len() as i64 == limit - 1 {
            out.push(rest.to_string());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                out.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            None => {
                out.push(rest.to_string());
                break;
            }
        }
    }
    out
}

fn str_partition(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    from_right: bool,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let text = text_of(recv);
    let sep = expect_str(exec, &args[0])?;
    let found = if from_right { text.rfind(&sep) } else { text.find(&sep) };
    let parts = match found {
        Some(at) => [&text[..at], sep.as_str(), &text[at + sep.len()..]],
        None if from_right => ["", "", text.as_str()],
        None => [text.as_str(), "", ""],
    };
    Ok(Value::array(parts.iter().map(|p| Value::str(*p)).collect()))
}

// =============================================================================
// Mutation
// =============================================================================

fn str_append(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    for value in &args {
        let piece = match value {
            Value::Int(code) => match u32::try_from(*code).ok().and_then(char::from_u32) {
                Some(c) => c.to_string(),
                None => return exec.raise("RangeError", format!("{} out of char range", code)),
            },
            other => expect_str(exec, other)?,
        };
        str_cell(recv).borrow_mut().push_str(&piece);
    }
    Ok(recv.clone())
}

fn str_replace(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let text = expect_str(exec, &args[0])?;
    *str_cell(recv).borrow_mut() = text;
    Ok(recv.clone())
}

fn str_insert(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 2, Some(2))?;
    let index = expect_int(exec, &args[0])?;
    let piece = expect_str(exec, &args[1])?;
    let text = text_of(recv);
    let len = text.chars().count() as i64;
    // negative indexes insert after the character
    let at = if index < 0 { index + len + 1 } else { index };
    if at < 0 || at > len {
        return exec.raise("IndexError", format!("index {} out of string", index));
    }
    let byte = byte_index(&text, at as usize);
    str_cell(recv).borrow_mut().insert_str(byte, &piece);
    Ok(recv.clone())
}

fn str_prepend(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let mut prefix = String::new();
    for value in &args {
        prefix.push_str(&expect_str(exec, value)?);
    }
    str_cell(recv).borrow_mut().insert_str(0, &prefix);
    Ok(recv.clone())
}

fn str_tr(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 2, Some(2))?;
    let from = CharSet::parse(&expect_str(exec, &args[0])?);
    let to: Vec<char> = expand_set(&expect_str(exec, &args[1])?.chars().collect::<Vec<_>>());
    let text = text_of(recv);
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if !from.contains(c) {
            out.push(c);
            continue;
        }
        if to.is_empty() {
            continue;
        }
        let mapped = if from.negate {
            to[to.len() - 1]
        } else {
            let position = from.chars.iter().position(|x| *x == c).unwrap_or(0);
            to[position.min(to.len() - 1)]
        };
        out.push(mapped);
    }
    Ok(Value::str(out))
}

fn char_sets(
    exec: &Exec<'_>,
    args: &Args,
) -> EvalResult<Vec<CharSet>> {
    args.iter()
        .map(|spec| expect_str(exec, spec).map(|spec| CharSet::parse(&spec)))
        .collect()
}

fn str_delete(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, None)?;
    let sets = char_sets(exec, &args)?;
    let kept: String = text_of(recv)
        .chars()
        .filter(|c| !sets.iter().all(|set| set.contains(*c)))
        .collect();
    Ok(Value::str(kept))
}

fn str_squeeze(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let sets = char_sets(exec, &args)?;
    let mut out = String::new();
    let mut previous = None;
    for c in text_of(recv).chars() {
        let squeezable = sets.iter().all(|set| set.contains(c));
        if previous == Some(c) && squeezable {
            continue;
        }
        out.push(c);
        previous = Some(c);
    }
    Ok(Value::str(out))
}

fn str_count(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, None)?;
    let sets = char_sets(exec, &args)?;
    let count = text_of(recv)
        .chars()
        .filter(|c| sets.iter().all(|set| set.contains(*c)))
        .count();
    Ok(Value::Int(count as i64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Justify {
    Left,
    Right,
    Center,
}

fn justify(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    how: Justify,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(2))?;
    let width = expect_int(exec, &args[0])?;
    if width > MAX_STRING {
        return exec.raise("ArgumentError", "argument too big");
    }
    let width = width.max(0) as usize;
    let pad: Vec<char> = match args.get(1) {
        Some(pad) => expect_str(exec, pad)?.chars().collect(),
        None => vec![' '],
    };
    if pad.is_empty() {
        return exec.raise("ArgumentError", "zero width padding");
    }
    let text = text_of(recv);
    let len = text.chars().count();
    if width <= len {
        return Ok(Value::str(text));
    }
    let total = width - len;
    let fill = |n: usize| pad.iter().cycle().take(n).collect::<String>();
    let (left, right) = match how {
        Justify::Left => (0, total),
        Justify::Right => (total, 0),
        Justify::Center => (total / 2, total - total / 2),
    };
    Ok(Value::str(format!("{}{}{}", fill(left), text, fill(right))))
}

fn sym_to_proc(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    match recv {
        Value::Sym(name) => Ok(exec.symbol_proc(name.clone())),
        other => Ok(other.clone()),
    }
}

// =============================================================================
// format
// =============================================================================

#[derive(Debug, Default)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

impl Spec {
    fn sign(
        &self,
        negative: bool,
    ) -> &'static str {
        if negative {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        }
    }

    /// Pad a converted number to the width. Zero padding goes between
    /// the sign and the digits.
    fn pad_number(
        &self,
        sign: &str,
        prefix: &str,
        digits: &str,
        zero_allowed: bool,
    ) -> String {
        let len = sign.len() + prefix.len() + digits.chars().count();
        let width = self.width.unwrap_or(0);
        if len >= width {
            return format!("{}{}{}", sign, prefix, digits);
        }
        let fill = width - len;
        if self.left {
            format!("{}{}{}{}", sign, prefix, digits, " ".repeat(fill))
        } else if self.zero && zero_allowed {
            format!("{}{}{}{}", sign, prefix, "0".repeat(fill), digits)
        } else {
            format!("{}{}{}{}", " ".repeat(fill), sign, prefix, digits)
        }
    }

    fn pad_text(
        &self,
        text: &str,
    ) -> String {
        let len = text.chars().count();
        let width = self.width.unwrap_or(0);
        if len >= width {
            return text.to_string();
        }
        let fill = " ".repeat(width - len);
        if self.left {
            format!("{}{}", text, fill)
        } else {
            format!("{}{}", fill, text)
        }
    }
}

fn next_arg(
    exec: &Exec<'_>,
    args: &[Value],
    index: &mut usize,
) -> EvalResult<Value> {
    match args.get(*index) {
        Some(value) => {
            *index += 1;
            Ok(value.clone())
        }
        None => exec.raise("ArgumentError", "too few arguments"),
    }
}

fn format_int_arg(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(x) if x.is_finite() => Ok(x.trunc() as i64),
        Value::Str(text) => match parse_integer(&text.borrow()) {
            Some(i) => Ok(i),
            None => exec.raise(
                "ArgumentError",
                format!("invalid value for Integer(): {}", inspect_str(&text.borrow())),
            ),
        },
        Value::Nil => exec.raise("TypeError", "can't convert nil into Integer"),
        other => expect_int(exec, other),
    }
}

fn format_float_arg(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<f64> {
    match value {
        Value::Str(text) => match text.borrow().trim().parse::<f64>() {
            Ok(x) => Ok(x),
            Err(_) => exec.raise(
                "ArgumentError",
                format!("invalid value for Float(): {}", inspect_str(&text.borrow())),
            ),
        },
        Value::Nil => exec.raise("TypeError", "can't convert nil into Float"),
        other => super::expect_num(exec, other),
    }
}

/// `1.5e+03` style with `precision` fraction digits
fn exponent_form(
    value: f64,
    precision: usize,
    upper: bool,
) -> String {
    let text = format!("{:.*e}", precision, value);
    let (mantissa, exponent) = text.split_once('e').unwrap_or((&text, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{}{}{}{:02}", mantissa, e, sign, exponent.abs())
}

fn general_form(
    value: f64,
    precision: usize,
    alt: bool,
    upper: bool,
) -> String {
    let precision = precision.max(1);
    let exponent = if value == 0.0 {
        0
    } else {
        let text = format!("{:.*e}", precision - 1, value);
        text.split_once('e')
            .and_then(|(_, e)| e.parse::<i32>().ok())
            .unwrap_or(0)
    };
    let strip = |text: String| {
        if alt || !text.contains('.') {
            return text;
        }
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    };
    if exponent < -4 || exponent >= precision as i32 {
        let text = exponent_form(value, precision - 1, upper);
        let (mantissa, tail) = text.split_at(text.find(['e', 'E']).unwrap_or(text.len()));
        format!("{}{}", strip(mantissa.to_string()), tail)
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        strip(format!("{:.*}", decimals, value))
    }
}

fn to_base(
    magnitude: u64,
    base: u32,
    upper: bool,
) -> String {
    let text = match base {
        16 if upper => format!("{:X}", magnitude),
        16 => format!("{:x}", magnitude),
        8 => format!("{:o}", magnitude),
        _ => format!("{:b}", magnitude),
    };
    text
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(d);
        chars.next();
    }
    digits
}

/// A width or precision no larger than [`MAX_STRING`]
fn bounded(digits: &str) -> Option<usize> {
    digits
        .parse::<i64>()
        .ok()
        .filter(|n| *n <= MAX_STRING)
        .map(|n| n as usize)
}

/// `sprintf`-style formatting: flags `-+ 0#`, width (or `*`),
/// precision, and the `d i u f e E g G x X o b B s p c %` conversions.
pub fn format(
    exec: &mut Exec<'_>,
    template: &str,
    args: &[Value],
) -> EvalResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut index = 0;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.left = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                '0' => spec.zero = true,
                '#' => spec.alt = true,
                _ => break,
            }
            chars.next();
        }
        if chars.peek() == Some(&'*') {
            chars.next();
            let width = format_int_arg(exec, &next_arg(exec, args, &mut index)?)?;
            if width < 0 {
                spec.left = true;
            }
            if width.unsigned_abs() > MAX_STRING as u64 {
                return exec.raise("ArgumentError", "width too big");
            }
            spec.width = Some(width.unsigned_abs() as usize);
        } else {
            let digits = take_digits(&mut chars);
            if !digits.is_empty() {
                match bounded(&digits) {
                    Some(width) => spec.width = Some(width),
                    None => return exec.raise("ArgumentError", "width too big"),
                }
            }
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            let digits = take_digits(&mut chars);
            match bounded(&digits) {
                Some(precision) => spec.precision = Some(precision),
                None if digits.is_empty() => spec.precision = Some(0),
                None => return exec.raise("ArgumentError", "precision too big"),
            }
        }
        let Some(conversion) = chars.next() else {
            return exec.raise("ArgumentError", "incomplete format specifier; use %% (double %) instead");
        };
        let piece = match conversion {
            '%' => "%".to_string(),
            'd' | 'i' | 'u' => {
                let value = format_int_arg(exec, &next_arg(exec, args, &mut index)?)?;
                let mut digits = value.unsigned_abs().to_string();
                if let Some(precision) = spec.precision {
                    if digits.len() < precision {
                        digits = format!("{}{}", "0".repeat(precision - digits.len()), digits);
                    }
                }
                spec.pad_number(spec.sign(value < 0), "", &digits, spec.precision.is_none())
            }
            'x' | 'X' | 'o' | 'b' | 'B' => {
                let value = format_int_arg(exec, &next_arg(exec, args, &mut index)?)?;
                let base = match conversion {
                    'x' | 'X' => 16,
                    'o' => 8,
                    _ => 2,
                };
                let digits = to_base(value.unsigned_abs(), base, conversion == 'X');
                let prefix = match (spec.alt, conversion) {
                    (false, _) => "",
                    (true, 'x') => "0x",
                    (true, 'X') => "0X",
                    (true, 'o') => "0",
                    (true, 'B') => "0B",
                    (true, _) => "0b",
                };
                spec.pad_number(spec.sign(value < 0), prefix, &digits, true)
            }
            'f' | 'e' | 'E' | 'g' | 'G' => {
                let value = format_float_arg(exec, &next_arg(exec, args, &mut index)?)?;
                if !value.is_finite() {
                    let body = if value.is_nan() { "NaN" } else { "Inf" };
                    spec.pad_number(spec.sign(value < 0.0), "", body, false)
                } else {
                    let precision = spec.precision.unwrap_or(6);
                    let magnitude = value.abs();
                    let digits = match conversion {
                        'f' => format!("{:.*}", precision, magnitude),
                        'e' | 'E' => exponent_form(magnitude, precision, conversion == 'E'),
                        _ => general_form(magnitude, precision, spec.alt, conversion == 'G'),
                    };
                    let negative = value.is_sign_negative() && value != 0.0;
                    spec.pad_number(spec.sign(negative), "", &digits, true)
                }
            }
            's' | 'p' => {
                let value = next_arg(exec, args, &mut index)?;
                let mut text = if conversion == 's' {
                    exec.to_s(&value)?
                } else {
                    exec.inspect_or_fallback(&value)?
                };
                if let Some(precision) = spec.precision {
                    text = text.chars().take(precision).collect();
                }
                spec.pad_text(&text)
            }
            'c' => {
                let value = next_arg(exec, args, &mut index)?;
                let text = match &value {
                    Value::Str(text) => text.borrow().chars().take(1).collect(),
                    other => {
                        let code = format_int_arg(exec, other)?;
                        match u32::try_from(code).ok().and_then(char::from_u32) {
                            Some(c) => c.to_string(),
                            None => {
                                return exec.raise("RangeError", format!("{} out of char range", code))
                            }
                        }
                    }
                };
                spec.pad_text(&text)
            }
            other => {
                return exec.raise("ArgumentError", format!("malformed format string - %{}", other));
            }
        };
        out.push_str(&piece);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::interpreter::tests::{eval, eval_err};

    #[test]
    fn test_succ() {
        assert_eq!(succ("a"), "b");
        assert_eq!(succ("az"), "ba");
        assert_eq!(succ("zz"), "aaa");
        assert_eq!(succ("a9"), "b0");
        assert_eq!(succ("Zz"), "AAa");
        assert_eq!(succ("1.9"), "2.0");
        assert_eq!(succ(""), "");
    }

    #[test]
    fn test_leading_numbers() {
        assert_eq!(leading_int("12abc", 10), 12);
        assert_eq!(leading_int("  -42", 10), -42);
        assert_eq!(leading_int("abc", 10), 0);
        assert_eq!(leading_int("1_000", 10), 1000);
        assert_eq!(leading_int("ff", 16), 255);
        assert_eq!(leading_float("3.5kg"), 3.5);
        assert_eq!(leading_float("1e3"), 1000.0);
        assert_eq!(leading_float("x"), 0.0);
    }

    #[test]
    fn test_char_set() {
        let set = CharSet::parse("a-c");
        assert!(set.contains('b'));
        assert!(!set.contains('d'));
        let negated = CharSet::parse("^a-c");
        assert!(negated.contains('d'));
    }

    #[test]
    fn test_indexing() {
        assert_eq!(eval("'hello'[1]"), "\"e\"");
        assert_eq!(eval("'hello'[-1]"), "\"o\"");
        assert_eq!(eval("'hello'[1, 3]"), "\"ell\"");
        assert_eq!(eval("'hello'[1..]"), "\"ello\"");
        assert_eq!(eval("'hello'[5]"), "nil");
        assert_eq!(eval("'hello'[5, 2]"), "\"\"");
        assert_eq!(eval("'hello'['ll']"), "\"ll\"");
        assert_eq!(eval("'hello'[/l+/]"), "\"ll\"");
        assert_eq!(eval("s = 'hello'; s[0] = 'J'; s"), "\"Jello\"");
        assert_eq!(eval("s = 'hello'; s['ll'] = 'LL'; s"), "\"heLLo\"");
    }

    #[test]
    fn test_case_and_whitespace() {
        assert_eq!(eval("'Hello'.upcase"), "\"HELLO\"");
        assert_eq!(eval("'hELLO wORLD'.capitalize"), "\"Hello world\"");
        assert_eq!(eval("'  hi  '.strip"), "\"hi\"");
        assert_eq!(eval("'abc'.upcase!; 'ABC'.upcase!"), "nil");
        assert_eq!(eval("\"line\\r\\n\".chomp"), "\"line\"");
        assert_eq!(eval("'abc'.chop"), "\"ab\"");
    }

    #[test]
    fn test_split_and_join_shapes() {
        assert_eq!(eval("' a  b c '.split"), "[\"a\", \"b\", \"c\"]");
        assert_eq!(eval("'a,b,,c,,'.split(',')"), "[\"a\", \"b\", \"\", \"c\"]");
        assert_eq!(eval("'a,b,c'.split(',', 2)"), "[\"a\", \"b,c\"]");
        assert_eq!(eval("'abc'.split('')"), "[\"a\", \"b\", \"c\"]");
        assert_eq!(eval("'a1b22c'.split(/\\d+/)"), "[\"a\", \"b\", \"c\"]");
    }

    #[test]
    fn test_substitution() {
        assert_eq!(eval("'hello'.sub('l', 'L')"), "\"heLlo\"");
        assert_eq!(eval("'hello'.gsub('l', 'L')"), "\"heLLo\"");
        assert_eq!(eval("'john smith'.gsub(/(\\w+)/) { |w| w.capitalize }"), "\"John Smith\"");
        assert_eq!(eval("'a-b'.gsub(/(\\w)-(\\w)/, '\\2-\\1')"), "\"b-a\"");
        assert_eq!(eval("'cat'.gsub(/[aeiou]/, 'a' => '4')"), "\"c4t\"");
        assert_eq!(eval("'abc'.gsub(//, '-')"), "\"-a-b-c-\"");
        assert_eq!(eval("s = 'aaa'; s.gsub!('a', 'b'); s"), "\"bbb\"");
        assert_eq!(eval("'xyz'.sub!('a', 'b')"), "nil");
    }

    #[test]
    fn test_scan_and_tr() {
        assert_eq!(eval("'a1b2'.scan(/\\d/)"), "[\"1\", \"2\"]");
        assert_eq!(eval("'k=v;x=y'.scan(/(\\w)=(\\w)/)"), "[[\"k\", \"v\"], [\"x\", \"y\"]]");
        assert_eq!(eval("'hello'.tr('el', 'ip')"), "\"hippo\"");
        assert_eq!(eval("'hello'.tr('a-y', 'b-z')"), "\"ifmmp\"");
        assert_eq!(eval("'hello'.delete('l')"), "\"heo\"");
        assert_eq!(eval("'aaabbb'.squeeze"), "\"ab\"");
        assert_eq!(eval("'hello world'.count('lo')"), "5");
    }

    #[test]
    fn test_mutation_is_shared() {
        assert_eq!(eval("a = 'x'; b = a; b << 'y'; a"), "\"xy\"");
        assert_eq!(eval("a = 'x'; b = a.dup; b << 'y'; a"), "\"x\"");
        assert_eq!(eval("'ab'.insert(1, 'X')"), "\"aXb\"");
        assert_eq!(eval("'a' << 98"), "\"ab\"");
    }

    #[test]
    fn test_operators() {
        assert_eq!(eval("'ab' * 3"), "\"ababab\"");
        assert_eq!(eval("'a' + 'b'"), "\"ab\"");
        assert_eq!(eval("'a' < 'b'"), "true");
        assert_eq!(eval("'a' <=> 'b'"), "-1");
        assert_eq!(eval("'a' == :a"), "false");
        assert_eq!(eval_err("'a' + 1"), "no implicit conversion of Integer into String (TypeError)");
        assert_eq!(eval_err("'a' * -1"), "negative argument (ArgumentError)");
        assert_eq!(
            eval_err("'a' < 1"),
            "comparison of String with 1 failed (ArgumentError)"
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(eval("'42abc'.to_i"), "42");
        assert_eq!(eval("'ff'.to_i(16)"), "255");
        assert_eq!(eval("'2.5'.to_f"), "2.5");
        assert_eq!(eval("'abc'.to_sym"), ":abc");
        assert_eq!(eval("'a'.ord"), "97");
        assert_eq!(eval("'az'.succ"), "\"ba\"");
    }

    #[test]
    fn test_justify() {
        assert_eq!(eval("'ab'.center(6, '*')"), "\"**ab**\"");
        assert_eq!(eval("'ab'.ljust(4, '.')"), "\"ab..\"");
        assert_eq!(eval("'ab'.rjust(4)"), "\"  ab\"");
        assert_eq!(eval("'ab'.rjust(-3)"), "\"ab\"");
    }

    #[test]
    fn test_huge_widths_are_refused() {
        assert_eq!(eval_err("'a'.ljust(100000000)"), "argument too big (ArgumentError)");
        assert_eq!(eval_err("'a'.center(10 ** 12)"), "argument too big (ArgumentError)");
        assert_eq!(eval_err("format('%1000000000d', 1)"), "width too big (ArgumentError)");
        assert_eq!(eval_err("format('%*d', -10 ** 12, 1)"), "width too big (ArgumentError)");
        assert_eq!(eval_err("'%.99999999999999999999f' % 1.0"), "precision too big (ArgumentError)");
    }

    #[test]
    fn test_format() {
        assert_eq!(eval("format('%05d', 42)"), "\"00042\"");
        assert_eq!(eval("format('%-5s|', 'ab')"), "\"ab   |\"");
        assert_eq!(eval("format('%.2f', 3.14159)"), "\"3.14\"");
        assert_eq!(eval("format('%+d', 5)"), "\"+5\"");
        assert_eq!(eval("format('%x', 255)"), "\"ff\"");
        assert_eq!(eval("format('%#b', 5)"), "\"0b101\"");
        assert_eq!(eval("format('%e', 1234.5)"), "\"1.234500e+03\"");
        assert_eq!(eval("format('%g', 0.0001)"), "\"0.0001\"");
        assert_eq!(eval("format('%g', 1234567.0)"), "\"1.23457e+06\"");
        assert_eq!(eval("format('%s and %p', 'a', 'a')"), "\"a and \\\"a\\\"\"");
        assert_eq!(eval("'%d%%' % 50"), "\"50%\"");
        assert_eq!(eval("'%s-%s' % [1, 2]"), "\"1-2\"");
        assert_eq!(eval_err("format('%d')"), "too few arguments (ArgumentError)");
    }

    #[test]
    fn test_symbols() {
        assert_eq!(eval(":abc.to_s"), "\"abc\"");
        assert_eq!(eval(":abc.length"), "3");
        assert_eq!(eval(":a <=> :b"), "-1");
        assert_eq!(eval("%w(a b).map(&:upcase)"), "[\"A\", \"B\"]");
        assert_eq!(eval(":upcase.to_proc.call('x')"), "\"X\"");
    }
}
