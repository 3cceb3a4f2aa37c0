//! Parse error classification tests

use super::*;
use crate::frontend::lexer::LexError;

#[test]
fn test_truncated_input_is_unexpected_eof() {
    for source in ["1 +", "if x", "if x\n1", "class Foo", "class Foo < Bar", "module M", "foo(1,", "[1, 2", "begin"] {
        match parse(source) {
            Err(ParseError::UnexpectedEof { .. }) => {}
            other => panic!("{:?}: expected end-of-input error, got {:?}", source, other),
        }
    }
}

#[test]
fn test_stray_end() {
    assert!(matches!(parse("end"), Err(ParseError::UnexpectedEnd { .. })));
    assert!(matches!(parse("1 end"), Err(ParseError::UnexpectedEnd { .. })));
}

#[test]
fn test_bare_def_needs_a_name() {
    assert!(matches!(parse("def"), Err(ParseError::MissingMethodName { .. })));
    assert!(matches!(parse("def self."), Err(ParseError::MissingMethodName { .. })));
}

#[test]
fn test_literal_where_a_name_belongs() {
    assert!(matches!(parse("class /x/"), Err(ParseError::UnexpectedLiteral { .. })));
    assert!(matches!(parse("def m(/x/)"), Err(ParseError::UnexpectedLiteral { .. })));
}

#[test]
fn test_invalid_assignments() {
    let error = parse("self = 1").unwrap_err();
    assert_eq!(error.to_string(), "Can't change the value of self");
    assert!(matches!(parse("nil = 1"), Err(ParseError::Invalid { .. })));
    assert!(matches!(parse("def m; X = 1; end"), Err(ParseError::Invalid { .. })));
    assert!(matches!(parse("1 = 2"), Err(ParseError::UnexpectedToken { .. })));
}

#[test]
fn test_class_definition_rules() {
    let error = parse("class foo; end").unwrap_err();
    assert_eq!(error.to_string(), "class/module name must be CONSTANT");
    let error = parse("def m; class X; end; end").unwrap_err();
    assert_eq!(error.to_string(), "class definition in method body");
    let error = parse("def m; module X; end; end").unwrap_err();
    assert_eq!(error.to_string(), "module definition in method body");
    assert!(parse("module m; end").is_err());
    assert!(parse("module M < Object; end").is_err());
}

#[test]
fn test_block_given_twice() {
    let error = parse("foo(&b) { }").unwrap_err();
    assert_eq!(error.to_string(), "both block arg and actual block given");
}

#[test]
fn test_errors_inside_interpolation_are_final() {
    assert!(matches!(
        parse("\"#{1 +}\""),
        Err(ParseError::UnexpectedToken { .. })
    ));
    assert!(matches!(
        parse("\"#{end}\""),
        Err(ParseError::UnexpectedToken { .. })
    ));
}

#[test]
fn test_lexer_error_takes_precedence() {
    assert!(matches!(
        parse("1 + `"),
        Err(ParseError::Lex(LexError::UnexpectedChar { ch: '`', .. }))
    ));
}

#[test]
fn test_error_messages() {
    let error = parse("if x").unwrap_err();
    assert!(error
        .to_string()
        .starts_with("syntax error, unexpected end-of-input, expecting"));
    assert_eq!(
        parse("end").unwrap_err().to_string(),
        "syntax error, unexpected 'end'"
    );
    assert_eq!(
        parse("def").unwrap_err().to_string(),
        "syntax error, method name expected after 'def'"
    );
}
