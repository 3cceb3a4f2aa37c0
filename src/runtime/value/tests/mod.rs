//! Value unit tests

use super::*;

#[test]
fn test_truthiness() {
    assert!(!Value::Nil.truthy());
    assert!(!Value::Bool(false).truthy());
    assert!(Value::Bool(true).truthy());
    assert!(Value::Int(0).truthy());
    assert!(Value::str("").truthy());
}

#[test]
fn test_identity() {
    let s = Value::str("a");
    assert!(s.identical(&s.clone()));
    assert!(!s.identical(&Value::str("a")));
    assert!(Value::Int(3).identical(&Value::Int(3)));
    assert!(Value::sym("x").identical(&Value::sym("x")));
}

#[test]
fn test_hash_keys_by_content() {
    let mut hash = HashValue::new();
    hash.insert(Value::str("k"), Value::Int(1));
    hash.insert(Value::Int(1), Value::Int(2));
    hash.insert(Value::Float(1.0), Value::Int(3));
    assert_eq!(hash.len(), 3);
    assert!(matches!(hash.get(&Value::str("k")), Some(Value::Int(1))));
    assert!(matches!(hash.get(&Value::Int(1)), Some(Value::Int(2))));
    assert!(matches!(hash.get(&Value::Float(1.0)), Some(Value::Int(3))));
}

#[test]
fn test_hash_string_key_is_copied() {
    let key = Value::str("a");
    let mut hash = HashValue::new();
    hash.insert(key.clone(), Value::Nil);
    if let Value::Str(s) = &key {
        s.borrow_mut().push('b');
    }
    assert!(hash.contains_key(&Value::str("a")));
    assert!(!hash.contains_key(&Value::str("ab")));
}

#[test]
fn test_hash_keeps_insertion_order_on_update() {
    let mut hash: HashValue = vec![
        (Value::sym("a"), Value::Int(1)),
        (Value::sym("b"), Value::Int(2)),
    ]
    .into_iter()
    .collect();
    hash.insert(Value::sym("a"), Value::Int(9));
    let keys: Vec<String> = hash.keys().iter().map(|k| format!("{:?}", k)).collect();
    assert_eq!(keys, vec![":a", ":b"]);
    assert!(matches!(hash.remove(&Value::sym("a")), Some(Value::Int(9))));
    assert_eq!(hash.len(), 1);
}

#[test]
fn test_range_int_bounds() {
    let inclusive = RangeValue {
        start: Value::Int(1),
        end: Value::Int(3),
        exclusive: false,
    };
    let exclusive = RangeValue {
        exclusive: true,
        ..inclusive
    };
    assert_eq!(exclusive.int_bounds(), Some((1, 2)));
}

#[test]
fn test_regexp_flags() {
    let re = RegexpValue::new("ab+", "xi").unwrap();
    assert_eq!(re.flags, "ix");
    assert!(re.regex.is_match("ABB"));
    assert!(RegexpValue::new("(", "").is_err());
}

#[test]
fn test_debug_output() {
    let array = Value::array(vec![Value::Int(1), Value::str("x"), Value::Nil]);
    assert_eq!(format!("{:?}", array), "[1, \"x\", nil]");
}
