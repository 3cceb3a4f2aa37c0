//! Lexer unit tests

use super::*;

fn lex(source: &str) -> Lexed {
    tokenize(source, &HashSet::new())
}

fn lex_with(
    source: &str,
    locals: &[&str],
) -> Lexed {
    let locals: HashSet<String> = locals.iter().map(|s| s.to_string()).collect();
    tokenize(source, &locals)
}

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source).tokens.into_iter().map(|t| t.kind).collect()
}

#[test]
fn test_empty_input_is_beg() {
    let lexed = lex("");
    assert_eq!(lexed.state, ExprState::Beg);
    assert_eq!(lexed.tokens.len(), 1);
    assert!(!lexed.in_literal);
}

#[test]
fn test_simple_expression_ends_in_end_state() {
    assert_eq!(lex("1 + 1").state, ExprState::End);
    assert_eq!(lex("1 +").state, ExprState::Beg);
    assert_eq!(lex("foo.").state, ExprState::Dot);
    assert_eq!(lex("Foo::").state, ExprState::Dot);
}

#[test]
fn test_keyword_states() {
    assert_eq!(lex("def").state, ExprState::Fname);
    assert_eq!(lex("def foo").state, ExprState::EndFn);
    assert_eq!(lex("def foo(a, b)").state, ExprState::EndFn);
    assert_eq!(lex("class").state, ExprState::Class);
    assert_eq!(lex("if").state, ExprState::Value);
    assert_eq!(lex("x and").state, ExprState::Value);
    assert_eq!(lex("return").state, ExprState::Mid);
    assert_eq!(lex("end").state, ExprState::End);
    assert_eq!(lex("foo(1)").state, ExprState::EndArg);
}

#[test]
fn test_identifier_states() {
    assert_eq!(lex("puts").state, ExprState::CmdArg);
    assert_eq!(lex("x = foo").state, ExprState::Arg);
    assert_eq!(lex_with("x", &["x"]).state, ExprState::End);
    assert_eq!(lex("Foo").state, ExprState::End);
    assert_eq!(lex("a.b").state, ExprState::Arg);
}

#[test]
fn test_terminators() {
    assert_eq!(lex("x = 1;").state, ExprState::Terminated);
    assert_eq!(lex("x = 1\n").state, ExprState::Terminated);
    assert_eq!(
        kinds("a\nb"),
        vec![
            TokenKind::Ident("a".into()),
            TokenKind::Newline,
            TokenKind::Ident("b".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_newline_ignored_after_operator() {
    assert_eq!(
        kinds("1 +\n2"),
        vec![
            TokenKind::Int(1),
            TokenKind::Plus,
            TokenKind::Int(2),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_backslash_continues_the_line() {
    let lexed = lex("a = 1 \\");
    assert!(lexed.error.is_none());
    assert_eq!(lexed.state, ExprState::Beg);
    assert_eq!(
        kinds("a = 1 \\\n+ 2"),
        vec![
            TokenKind::Ident("a".into()),
            TokenKind::Assign,
            TokenKind::Int(1),
            TokenKind::Plus,
            TokenKind::Int(2),
            TokenKind::Eof,
        ]
    );
    assert_eq!(lex("a = 1 \\\n").state, ExprState::End);
}

#[test]
fn test_open_string_sets_in_literal() {
    assert!(lex("\"abc").in_literal);
    assert!(lex("'abc").in_literal);
    assert!(lex("x = \"a #{b").in_literal);
    assert!(lex(":\"sym").in_literal);
    assert!(lex("%w(a b").in_literal);
    assert!(!lex("\"abc\"").in_literal);
}

#[test]
fn test_string_escapes_and_interpolation() {
    let tokens = kinds(r#""a\tb#{x + 1}c""#);
    assert_eq!(
        tokens[0],
        TokenKind::Str(vec![
            StrPart::Lit("a\tb".into()),
            StrPart::Code("x + 1".into()),
            StrPart::Lit("c".into()),
        ])
    );
    assert_eq!(
        kinds(r"'it\'s \n'")[0],
        TokenKind::Str(vec![StrPart::Lit("it's \\n".into())])
    );
    assert_eq!(
        kinds(r#""é\x41""#)[0],
        TokenKind::Str(vec![StrPart::Lit("éA".into())])
    );
}

#[test]
fn test_interpolation_with_nested_braces() {
    let tokens = kinds(r##""#{h.map { |k| "#{k}" }}""##);
    assert_eq!(
        tokens[0],
        TokenKind::Str(vec![StrPart::Code(r##"h.map { |k| "#{k}" }"##.into())])
    );
}

#[test]
fn test_numbers() {
    assert_eq!(kinds("42")[0], TokenKind::Int(42));
    assert_eq!(kinds("1_000")[0], TokenKind::Int(1000));
    assert_eq!(kinds("0x1F")[0], TokenKind::Int(31));
    assert_eq!(kinds("0b101")[0], TokenKind::Int(5));
    assert_eq!(kinds("1.5")[0], TokenKind::Float(1.5));
    assert_eq!(kinds("2e3")[0], TokenKind::Float(2000.0));
    assert_eq!(
        kinds("3.times"),
        vec![
            TokenKind::Int(3),
            TokenKind::Dot,
            TokenKind::Ident("times".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_slash_depends_on_state() {
    assert_eq!(kinds("a = /x/")[2], TokenKind::Regexp {
        parts: vec![StrPart::Lit("x".into())],
        flags: String::new(),
    });
    assert_eq!(kinds("puts /x/i")[1], TokenKind::Regexp {
        parts: vec![StrPart::Lit("x".into())],
        flags: "i".into(),
    });
    let with_local = lex_with("x /2", &["x"]);
    assert_eq!(with_local.tokens[1].kind, TokenKind::Slash);
    assert!(!with_local.in_literal);
    let unknown = lex("x /2");
    assert!(matches!(unknown.tokens[1].kind, TokenKind::Regexp { .. }));
    assert!(unknown.in_literal);
}

#[test]
fn test_minus_depends_on_spacing() {
    assert_eq!(kinds("a - 1")[1], TokenKind::Minus);
    assert_eq!(kinds("puts -1")[1], TokenKind::UMinus);
    assert_eq!(kinds("-1")[0], TokenKind::UMinus);
    assert_eq!(lex_with("x -1", &["x"]).tokens[1].kind, TokenKind::Minus);
    assert_eq!(kinds("x -= 1")[1], TokenKind::OpAssign("-".into()));
}

#[test]
fn test_assignment_declares_local() {
    let lexed = lex("x = 4; x /2");
    let slash = lexed
        .tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Slash)
        .count();
    assert_eq!(slash, 1);
    assert!(!lexed.in_literal);
}

#[test]
fn test_block_params_declare_locals() {
    let lexed = lex("[1].each { |v| v /2 }");
    assert!(lexed.tokens.iter().any(|t| t.kind == TokenKind::Slash));
    assert!(lexed.tokens.iter().any(|t| t.kind == TokenKind::LBraceBlock));
    let empty = kinds("foo { || 1 }");
    assert_eq!(empty[2], TokenKind::Pipe);
    assert_eq!(empty[3], TokenKind::Pipe);
}

#[test]
fn test_hash_brace_versus_block_brace() {
    assert_eq!(kinds("x = {a: 1}")[2], TokenKind::LBrace);
    assert_eq!(kinds("x = {a: 1}")[3], TokenKind::Label("a".into()));
    assert_eq!(kinds("loop { }")[1], TokenKind::LBraceBlock);
}

#[test]
fn test_symbols() {
    assert_eq!(kinds(":foo")[0], TokenKind::Symbol("foo".into()));
    assert_eq!(kinds(":empty?")[0], TokenKind::Symbol("empty?".into()));
    assert_eq!(kinds(":+")[0], TokenKind::Symbol("+".into()));
    assert_eq!(kinds(":@x")[0], TokenKind::Symbol("@x".into()));
    assert_eq!(
        kinds("a ? b : c")[3],
        TokenKind::Colon,
        "ternary colon must not become a symbol"
    );
}

#[test]
fn test_method_names_after_def() {
    assert_eq!(kinds("def +(o)")[1], TokenKind::Ident("+".into()));
    assert_eq!(kinds("def []=(k, v)")[1], TokenKind::Ident("[]=".into()));
    assert_eq!(kinds("def name=(v)")[1], TokenKind::Ident("name=".into()));
    assert_eq!(kinds("def end")[1], TokenKind::Ident("end".into()));
    assert_eq!(kinds("def self.build")[1], TokenKind::KwSelf);
    assert_eq!(lex("def self.build").state, ExprState::EndFn);
    assert_eq!(lex("def self.").state, ExprState::Fname);
}

#[test]
fn test_keywords_after_dot_are_method_names() {
    assert_eq!(kinds("x.class")[2], TokenKind::Ident("class".into()));
    assert_eq!(kinds("x.nil?")[2], TokenKind::Ident("nil?".into()));
}

#[test]
fn test_def_params_declare_locals() {
    let lexed = lex("def half(n) n /2 end");
    assert!(lexed.tokens.iter().any(|t| t.kind == TokenKind::Slash));
    let bare = lex("def half n\nn /2\nend");
    assert!(bare.tokens.iter().any(|t| t.kind == TokenKind::Slash));
}

#[test]
fn test_heredoc_body_and_resume() {
    let lexed = lex("x = <<~EOS\n  hello\n    world\n  EOS\nx");
    assert!(!lexed.in_literal);
    assert_eq!(
        lexed.tokens[2].kind,
        TokenKind::Str(vec![StrPart::Lit("hello\n  world\n".into())])
    );
    assert_eq!(lexed.tokens[3].kind, TokenKind::Newline);
    assert_eq!(lexed.tokens[4].kind, TokenKind::Ident("x".into()));
}

#[test]
fn test_unterminated_heredoc_is_open_literal() {
    assert!(lex("x = <<EOS").in_literal);
    assert!(lex("x = <<EOS\nline one").in_literal);
    assert!(lex("x = <<-EOS\nline one\n").in_literal);
}

#[test]
fn test_shift_is_not_heredoc() {
    assert_eq!(lex_with("a << b", &["a", "b"]).tokens[1].kind, TokenKind::Shl);
    assert_eq!(kinds("[] << 1")[2], TokenKind::Shl);
}

#[test]
fn test_word_lists() {
    assert_eq!(
        kinds("%w(a b c)")[0],
        TokenKind::Words {
            items: vec!["a".into(), "b".into(), "c".into()],
            symbols: false,
        }
    );
    assert_eq!(
        kinds("%i[x y]")[0],
        TokenKind::Words {
            items: vec!["x".into(), "y".into()],
            symbols: true,
        }
    );
}

#[test]
fn test_comments_are_skipped() {
    assert_eq!(lex("x = 1 # note").state, ExprState::End);
    assert_eq!(lex("x = # note").state, ExprState::Beg);
}

#[test]
fn test_invalid_character_reports_error() {
    let lexed = lex("x = `ls`");
    assert!(matches!(
        lexed.error,
        Some(LexError::UnexpectedChar { ch: '`', .. })
    ));
    assert_eq!(lexed.tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
}

#[test]
fn test_spaced_flag() {
    let tokens = lex("foo (1)").tokens;
    assert!(tokens[1].spaced);
    let tokens = lex("foo(1)").tokens;
    assert!(!tokens[1].spaced);
}

#[test]
fn test_labels_only_in_argument_positions() {
    assert_eq!(kinds("foo a: 1")[1], TokenKind::Label("a".into()));
    let ternary = kinds("c ? a : b");
    assert_eq!(ternary[2], TokenKind::Ident("a".into()));
}
