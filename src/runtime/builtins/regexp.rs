//! Regexp and MatchData
//!
//! Matching is done by the `regex` crate. Every match updates the
//! last-match globals: `$~` holds the `MatchData`, `$1` to `$9` the
//! numbered groups. Offsets reported to scripts are character offsets.

use super::{arg, expect_int, expect_str};
use crate::runtime::class::CoreClasses;
use crate::runtime::interpreter::{EvalResult, Exec};
use crate::runtime::value::{inspect_str, Args, Object, RegexpValue, Value};
use regex::Captures;
use std::rc::Rc;

const GROUPS_IVAR: &str = "groups";
const NAMES_IVAR: &str = "names";
const OFFSETS_IVAR: &str = "offsets";
const STRING_IVAR: &str = "string";

pub fn register(core: &CoreClasses) {
    let regexp = &core.regexp;
    regexp.define_singleton_native("new", regexp_new);
    regexp.define_singleton_native("compile", regexp_new);
    regexp.define_singleton_native("escape", regexp_escape);
    regexp.define_singleton_native("quote", regexp_escape);
    regexp.define_native("match", regexp_match);
    regexp.define_native("match?", regexp_match_p);
    regexp.define_native("=~", regexp_match_index);
    regexp.define_native("===", regexp_case_eq);
    regexp.define_native("source", |exec, recv, _, _| Ok(Value::str(regexp_of(exec, recv)?.source.clone())));
    regexp.define_native("to_s", regexp_inspect);
    regexp.define_native("inspect", regexp_inspect);
    regexp.define_native("names", regexp_names);

    let match_data = &core.match_data;
    match_data.define_native("[]", match_aref);
    match_data.define_native("to_a", |_, recv, _, _| Ok(Value::array(groups_of(recv))));
    match_data.define_native("captures", |_, recv, _, _| {
        Ok(Value::array(groups_of(recv).into_iter().skip(1).collect()))
    });
    match_data.define_native("named_captures", match_named_captures);
    match_data.define_native("names", |exec, recv, _, _| {
        let names = group_names(exec, recv).into_iter().flatten().map(Value::str);
        Ok(Value::array(names.collect()))
    });
    match_data.define_native("pre_match", |exec, recv, _, _| match_context(exec, recv, true));
    match_data.define_native("post_match", |exec, recv, _, _| match_context(exec, recv, false));
    match_data.define_native("begin", |exec, recv, args, _| match_offset(exec, recv, &args, 0));
    match_data.define_native("end", |exec, recv, args, _| match_offset(exec, recv, &args, 1));
    match_data.define_native("size", |_, recv, _, _| Ok(Value::Int(groups_of(recv).len() as i64)));
    match_data.define_native("length", |_, recv, _, _| Ok(Value::Int(groups_of(recv).len() as i64)));
    match_data.define_native("string", |exec, recv, _, _| Ok(exec.ivar_get(recv, STRING_IVAR)));
    match_data.define_native("to_s", |_, recv, _, _| Ok(groups_of(recv).first().cloned().unwrap_or_default()));
    match_data.define_native("inspect", match_inspect);
}

// =============================================================================
// Matching helpers
// =============================================================================

fn regexp_of(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<Rc<RegexpValue>> {
    match value {
        Value::Regexp(re) => Ok(re.clone()),
        other => coerce(exec, other),
    }
}

/// Regexp argument, with strings matched literally.
pub fn coerce(
    exec: &Exec<'_>,
    pattern: &Value,
) -> EvalResult<Rc<RegexpValue>> {
    match pattern {
        Value::Regexp(re) => Ok(re.clone()),
        Value::Str(text) => {
            let literal = regex::escape(&text.borrow());
            compile(exec, &literal, "")
        }
        other => {
            let class = exec.class_of(other);
            exec.raise(
                "TypeError",
                format!("wrong argument type {} (expected Regexp)", class.name),
            )
        }
    }
}

fn compile(
    exec: &Exec<'_>,
    source: &str,
    flags: &str,
) -> EvalResult<Rc<RegexpValue>> {
    match RegexpValue::new(source, flags) {
        Ok(re) => Ok(Rc::new(re)),
        Err(e) => exec.raise("RegexpError", e.to_string()),
    }
}

/// Character offset of byte offset `byte` in `text`
pub fn char_index(
    text: &str,
    byte: usize,
) -> usize {
    text.get(..byte).map_or(0, |prefix| prefix.chars().count())
}

/// Byte offset of character offset `index`, clamped to the end
pub fn byte_index(
    text: &str,
    index: usize,
) -> usize {
    text.char_indices().nth(index).map_or(text.len(), |(byte, _)| byte)
}

/// Build a `MatchData` for `caps` and make it the last match.
pub fn record_match(
    exec: &mut Exec<'_>,
    re: &RegexpValue,
    text: &str,
    caps: &Captures<'_>,
) -> Value {
    let mut groups = Vec::with_capacity(caps.len());
    let mut offsets = Vec::with_capacity(caps.len());
    for group in caps.iter() {
        match group {
            Some(m) => {
                groups.push(Value::str(m.as_str()));
                offsets.push(Value::array(vec![
                    Value::Int(char_index(text, m.start()) as i64),
                    Value::Int(char_index(text, m.end()) as i64),
                ]));
            }
            None => {
                groups.push(Value::Nil);
                offsets.push(Value::Nil);
            }
        }
    }
    // one entry per numbered group, `nil` for unnamed ones
    let names = re
        .regex
        .capture_names()
        .skip(1)
        .map(|name| name.map(Value::str).unwrap_or_default())
        .collect::<Vec<_>>();
    let object = Object::new(exec.interp.core.match_data.clone());
    {
        let mut ivars = object.ivars.borrow_mut();
        ivars.insert(GROUPS_IVAR.to_string(), Value::array(groups.clone()));
        ivars.insert(NAMES_IVAR.to_string(), Value::array(names));
        ivars.insert(OFFSETS_IVAR.to_string(), Value::array(offsets));
        ivars.insert(STRING_IVAR.to_string(), Value::str(text));
    }
    let data = Value::Object(object);
    set_last_match(exec, data.clone(), &groups);
    data
}

fn set_last_match(
    exec: &mut Exec<'_>,
    data: Value,
    groups: &[Value],
) {
    let globals = &mut exec.interp.globals;
    globals.insert("$~".to_string(), data);
    for n in 1..=9 {
        let group = groups.get(n).cloned().unwrap_or_default();
        globals.insert(format!("${}", n), group);
    }
}

pub fn clear_last_match(exec: &mut Exec<'_>) {
    set_last_match(exec, Value::Nil, &[]);
}

/// First match at or after character `from`; `MatchData` or `nil`.
pub fn search(
    exec: &mut Exec<'_>,
    re: &RegexpValue,
    text: &str,
    from: usize,
) -> Value {
    let start = byte_index(text, from);
    match re.regex.captures_at(text, start) {
        Some(caps) => record_match(exec, re, text, &caps),
        None => {
            clear_last_match(exec);
            Value::Nil
        }
    }
}

/// `=~`: character index of the first match, or `nil`
pub fn match_index(
    exec: &mut Exec<'_>,
    re: &RegexpValue,
    text: &str,
) -> Value {
    match re.regex.captures(text) {
        Some(caps) => {
            let start = caps.get(0).map_or(0, |m| m.start());
            record_match(exec, re, text, &caps);
            Value::Int(char_index(text, start) as i64)
        }
        None => {
            clear_last_match(exec);
            Value::Nil
        }
    }
}

/// Expand `\0`-`\9`, `\k<name>` and `\\` in a `sub` replacement.
pub fn expand_replacement(
    template: &str,
    caps: &Captures<'_>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some(d) if d.is_ascii_digit() => {
                chars.next();
                let n = d.to_digit(10).unwrap_or(0) as usize;
                out.push_str(caps.get(n).map_or("", |m| m.as_str()));
            }
            Some('&') => {
                chars.next();
                out.push_str(caps.get(0).map_or("", |m| m.as_str()));
            }
            Some('k') => {
                chars.next();
                if chars.peek() == Some(&'<') {
                    chars.next();
                    let name: String = chars.by_ref().take_while(|c| *c != '>').collect();
                    out.push_str(caps.name(&name).map_or("", |m| m.as_str()));
                } else {
                    out.push_str("\\k");
                }
            }
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            _ => out.push('\\'),
        }
    }
    out
}

// =============================================================================
// Regexp
// =============================================================================

fn regexp_new(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(2))?;
    if let Value::Regexp(re) = &args[0] {
        return Ok(Value::Regexp(re.clone()));
    }
    let source = expect_str(exec, &args[0])?;
    let flags = match arg(&args, 1) {
        Value::Str(flags) => flags.borrow().clone(),
        Value::Int(bits) => {
            let mut flags = String::new();
            if bits & 1 != 0 {
                flags.push('i');
            }
            if bits & 2 != 0 {
                flags.push('x');
            }
            if bits & 4 != 0 {
                flags.push('m');
            }
            flags
        }
        value if value.truthy() => "i".to_string(),
        _ => String::new(),
    };
    Ok(Value::Regexp(compile(exec, &source, &flags)?))
}

fn regexp_escape(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let text = super::expect_name(exec, &args[0])?;
    Ok(Value::str(regex::escape(&text)))
}

/// Subject of a match: strings, symbols, or `nil` for no match.
fn subject(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<Option<String>> {
    match value {
        Value::Nil => Ok(None),
        Value::Sym(name) => Ok(Some(name.to_string())),
        other => expect_str(exec, other).map(Some),
    }
}

fn regexp_match(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(2))?;
    let re = regexp_of(exec, recv)?;
    let Some(text) = subject(exec, &args[0])? else {
        clear_last_match(exec);
        return Ok(Value::Nil);
    };
    let from = match args.get(1) {
        Some(pos) => expect_int(exec, pos)?.max(0) as usize,
        None => 0,
    };
    let data = search(exec, &re, &text, from);
    match block {
        Some(block) if !data.is_nil() => exec.call_block(&block, smallvec::smallvec![data]),
        _ => Ok(data),
    }
}

fn regexp_match_p(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let re = regexp_of(exec, recv)?;
    Ok(Value::Bool(match subject(exec, &args[0])? {
        Some(text) => re.regex.is_match(&text),
        None => false,
    }))
}

fn regexp_match_index(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let re = regexp_of(exec, recv)?;
    match subject(exec, &args[0])? {
        Some(text) => Ok(match_index(exec, &re, &text)),
        None => {
            clear_last_match(exec);
            Ok(Value::Nil)
        }
    }
}

fn regexp_case_eq(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let re = regexp_of(exec, recv)?;
    let text = match &args[0] {
        Value::Str(text) => text.borrow().clone(),
        Value::Sym(name) => name.to_string(),
        _ => return Ok(Value::Bool(false)),
    };
    Ok(Value::Bool(!match_index(exec, &re, &text).is_nil()))
}

fn regexp_inspect(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let re = regexp_of(exec, recv)?;
    Ok(Value::str(format!("/{}/{}", re.source, re.flags)))
}

fn regexp_names(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let re = regexp_of(exec, recv)?;
    Ok(Value::array(
        re.regex.capture_names().flatten().map(Value::str).collect(),
    ))
}

// =============================================================================
// MatchData
// =============================================================================

fn groups_of(value: &Value) -> Vec<Value> {
    match value {
        Value::Object(object) => object
            .ivars
            .borrow()
            .get(GROUPS_IVAR)
            .and_then(Value::array_items)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Name of each numbered group after the whole match
fn group_names(
    exec: &Exec<'_>,
    recv: &Value,
) -> Vec<Option<String>> {
    exec.ivar_get(recv, NAMES_IVAR)
        .array_items()
        .unwrap_or_default()
        .iter()
        .map(|name| match name {
            Value::Str(name) => Some(name.borrow().clone()),
            _ => None,
        })
        .collect()
}

/// Index of a named group among the numbered ones
fn named_index(
    exec: &Exec<'_>,
    recv: &Value,
    name: &str,
) -> EvalResult<usize> {
    let names = group_names(exec, recv);
    match names.iter().position(|n| n.as_deref() == Some(name)) {
        Some(position) => Ok(position + 1),
        None => exec.raise("IndexError", format!("undefined group name reference: {}", name)),
    }
}

fn match_aref(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let groups = groups_of(recv);
    let index = match &args[0] {
        Value::Int(i) => {
            let i = if *i < 0 { *i + groups.len() as i64 } else { *i };
            if i < 0 {
                return Ok(Value::Nil);
            }
            i as usize
        }
        Value::Str(name) => {
            let name = name.borrow().clone();
            named_index(exec, recv, &name)?
        }
        Value::Sym(name) => named_index(exec, recv, name)?,
        other => return super::expect_int(exec, other).map(|_| Value::Nil),
    };
    Ok(groups.get(index).cloned().unwrap_or_default())
}

fn match_named_captures(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let groups = groups_of(recv);
    let hash = group_names(exec, recv)
        .into_iter()
        .enumerate()
        .filter_map(|(i, name)| {
            let group = groups.get(i + 1).cloned().unwrap_or_default();
            name.map(|name| (Value::str(name), group))
        })
        .collect();
    Ok(Value::hash(hash))
}

/// Character offsets `[begin, end]` of group `n`
fn offsets_of(
    exec: &Exec<'_>,
    recv: &Value,
    n: usize,
) -> Option<(i64, i64)> {
    let offsets = exec.ivar_get(recv, OFFSETS_IVAR).array_items()?;
    let pair = offsets.get(n)?.array_items()?;
    Some((pair.first()?.as_int()?, pair.get(1)?.as_int()?))
}

fn match_offset(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: &Args,
    which: usize,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let n = expect_int(exec, &args[0])?;
    let count = groups_of(recv).len() as i64;
    if n < 0 || n >= count {
        return exec.raise("IndexError", format!("index {} out of matches", n));
    }
    Ok(match offsets_of(exec, recv, n as usize) {
        Some((begin, end)) => Value::Int(if which == 0 { begin } else { end }),
        None => Value::Nil,
    })
}

fn match_context(
    exec: &mut Exec<'_>,
    recv: &Value,
    before: bool,
) -> EvalResult<Value> {
    let text = match exec.ivar_get(recv, STRING_IVAR) {
        Value::Str(text) => text.borrow().clone(),
        _ => String::new(),
    };
    let (begin, end) = offsets_of(exec, recv, 0).unwrap_or((0, 0));
    let chars: Vec<char> = text.chars().collect();
    let part: String = if before {
        chars.iter().take(begin as usize).collect()
    } else {
        chars.iter().skip(end as usize).collect()
    };
    Ok(Value::str(part))
}

fn match_inspect(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let groups = groups_of(recv);
    let names = group_names(exec, recv);
    let show = |value: &Value| match value {
        Value::Str(text) => inspect_str(&text.borrow()),
        _ => "nil".to_string(),
    };
    let mut text = String::from("#<MatchData ");
    text.push_str(&groups.first().map(show).unwrap_or_default());
    for (i, group) in groups.iter().enumerate().skip(1) {
        let label = names
            .get(i - 1)
            .cloned()
            .flatten()
            .unwrap_or_else(|| i.to_string());
        text.push_str(&format!(" {}:{}", label, show(group)));
    }
    text.push('>');
    Ok(Value::str(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::interpreter::tests::{eval, eval_err};

    #[test]
    fn test_char_offsets() {
        assert_eq!(char_index("héllo", 3), 2);
        assert_eq!(byte_index("héllo", 2), 3);
        assert_eq!(byte_index("abc", 10), 3);
    }

    #[test]
    fn test_match_operator_sets_groups() {
        assert_eq!(eval("'hello world' =~ /o w/"), "4");
        assert_eq!(eval("'key=val' =~ /(\\w+)=(\\w+)/; [$1, $2]"), "[\"key\", \"val\"]");
        assert_eq!(eval("'abc' =~ /z/"), "nil");
        assert_eq!(eval("'abc' =~ /z/; $~"), "nil");
    }

    #[test]
    fn test_match_data() {
        assert_eq!(eval("/(\\d+)-(\\d+)/.match('tel 12-34')"), "#<MatchData \"12-34\" 1:\"12\" 2:\"34\">");
        assert_eq!(eval("m = /(?<y>\\d+)/.match('in 2024'); m[:y]"), "\"2024\"");
        assert_eq!(eval("m = /b/.match('abc'); [m.pre_match, m.post_match]"), "[\"a\", \"c\"]");
        assert_eq!(eval("/b/.match('abc').begin(0)"), "1");
        assert_eq!(eval("/(a)(x)?/.match('a').captures"), "[\"a\", nil]");
    }

    #[test]
    fn test_case_equality() {
        assert_eq!(eval("case 'abc' when /b/ then 1 else 2 end"), "1");
        assert_eq!(eval("/b/ === 5"), "false");
    }

    #[test]
    fn test_flags_and_inspect() {
        assert_eq!(eval("/ab/i"), "/ab/i");
        assert_eq!(eval("/AB/i.match?('xaby')"), "true");
        assert_eq!(eval("Regexp.new('a.c').source"), "\"a.c\"");
        assert_eq!(eval("Regexp.escape('a.c')"), "\"a\\\\.c\"");
    }

    #[test]
    fn test_invalid_pattern() {
        let message = eval_err("Regexp.new('(')");
        assert!(message.ends_with("(RegexpError)"), "{}", message);
    }

    #[test]
    fn test_expand_replacement() {
        let re = regex::Regex::new(r"(\w)(?<rest>\w*)").unwrap();
        let caps = re.captures("hello").unwrap();
        assert_eq!(expand_replacement(r"\2\1", &caps), "elloh");
        assert_eq!(expand_replacement(r"<\k<rest>>", &caps), "<ello>");
        assert_eq!(expand_replacement(r"\\", &caps), "\\");
    }
}
