//! Basic parser tests

use super::*;

#[test]
fn test_parse_empty_program() {
    let program = parse("").unwrap();
    assert!(program.body.is_empty());
    assert!(parse("\n;\n").unwrap().body.is_empty());
}

#[test]
fn test_operator_precedence() {
    let call = call_of(stmt("1 + 2 * 3"));
    assert_eq!(call.name, "+");
    assert!(matches!(call.recv.unwrap().kind, ExprKind::Int(1)));
    let Arg::Expr(rhs) = &call.args[0] else {
        panic!("expected plain argument");
    };
    match &rhs.kind {
        ExprKind::Call(inner) => assert_eq!(inner.name, "*"),
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn test_power_is_right_associative_and_binds_over_unary_minus() {
    let call = call_of(stmt("-2 ** 2"));
    assert_eq!(call.name, "-@");
    let pow = call_of(call.recv.unwrap().kind);
    assert_eq!(pow.name, "**");

    let call = call_of(stmt("2 ** 3 ** 2"));
    assert!(matches!(call.recv.unwrap().kind, ExprKind::Int(2)));
}

#[test]
fn test_negative_literal_folds() {
    assert!(matches!(stmt("-5"), ExprKind::Int(-5)));
    assert!(matches!(stmt("-1.5"), ExprKind::Float(v) if v == -1.5));
}

#[test]
fn test_assignment_declares_local() {
    let program = parse("x = 1; x").unwrap();
    assert_eq!(program.body.len(), 2);
    assert!(matches!(&program.body[1].kind, ExprKind::LocalVar(name) if name == "x"));
}

#[test]
fn test_known_locals_are_variables() {
    let program = parse_with("x", &["x"]).unwrap();
    assert!(matches!(&program.body[0].kind, ExprKind::LocalVar(_)));
    let call = call_of(parse("x").unwrap().body.remove(0).kind);
    assert!(call.vcall);
}

#[test]
fn test_command_call_arguments() {
    let call = call_of(stmt("puts 1, 2"));
    assert_eq!(call.name, "puts");
    assert_eq!(call.args.len(), 2);
    assert!(!call.vcall);
}

#[test]
fn test_labels_collect_into_trailing_hash() {
    let call = call_of(stmt("foo(1, a: 2, :b => 3)"));
    assert_eq!(call.args.len(), 2);
    match &call.args[1] {
        Arg::Expr(Expr {
            kind: ExprKind::Hash(pairs),
            ..
        }) => assert_eq!(pairs.len(), 2),
        other => panic!("expected hash, got {:?}", other),
    }
}

#[test]
fn test_do_block_with_params() {
    let call = call_of(stmt("[1, 2].each do |x| x end"));
    assert_eq!(call.name, "each");
    let Some(BlockArg::Literal(block)) = call.block else {
        panic!("expected block literal");
    };
    assert_eq!(block.params.required, vec!["x".to_string()]);
    assert!(matches!(&block.body[0].kind, ExprKind::LocalVar(_)));
}

#[test]
fn test_do_binds_to_command_not_argument() {
    let call = call_of(stmt("foo bar do end"));
    assert_eq!(call.name, "foo");
    assert!(call.block.is_some());
    let Arg::Expr(arg) = &call.args[0] else {
        panic!("expected plain argument");
    };
    let inner = call_of(arg.kind.clone());
    assert!(inner.block.is_none());
}

#[test]
fn test_brace_block_and_block_pass() {
    let call = call_of(stmt("[1].map { |v| v * 2 }"));
    assert!(matches!(call.block, Some(BlockArg::Literal(_))));
    let call = call_of(stmt("[1].map(&blk)"));
    assert!(matches!(call.block, Some(BlockArg::Pass(_))));
}

#[test]
fn test_if_elsif_else() {
    match stmt("if a then 1 elsif b then 2 else 3 end") {
        ExprKind::If {
            then_body,
            else_body,
            ..
        } => {
            assert_eq!(then_body.len(), 1);
            assert!(matches!(else_body[0].kind, ExprKind::If { .. }));
        }
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn test_unless_swaps_branches() {
    match stmt("unless x; 1; end") {
        ExprKind::If {
            then_body,
            else_body,
            ..
        } => {
            assert!(then_body.is_empty());
            assert_eq!(else_body.len(), 1);
        }
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn test_modifiers() {
    assert!(matches!(stmt("x = 1 if y"), ExprKind::If { .. }));
    assert!(matches!(
        stmt("i += 1 while i < 3"),
        ExprKind::While { do_while: false, .. }
    ));
    assert!(matches!(
        stmt("begin; i += 1; end while false"),
        ExprKind::While { do_while: true, .. }
    ));
    match stmt("x = raise rescue 5") {
        ExprKind::Assign { value, .. } => assert!(matches!(value.kind, ExprKind::Begin(_))),
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn test_ternary() {
    match parse_with("x ? 1 : 2", &["x"]).unwrap().body.remove(0).kind {
        ExprKind::If {
            then_body,
            else_body,
            ..
        } => {
            assert!(matches!(then_body[0].kind, ExprKind::Int(1)));
            assert!(matches!(else_body[0].kind, ExprKind::Int(2)));
        }
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn test_while_loop_resolves_break() {
    match stmt("while true do break end") {
        ExprKind::While { body, .. } => {
            assert!(matches!(body[0].kind, ExprKind::Break(None, JumpTarget::Loop)));
        }
        other => panic!("expected while, got {:?}", other),
    }
}

#[test]
fn test_jumps_inside_blocks_and_top_level() {
    let program = parse("[1].each { next }").unwrap();
    assert!(program.invalid_jumps.is_empty());

    let program = parse("break").unwrap();
    assert_eq!(program.invalid_jumps.len(), 1);
    assert_eq!(program.invalid_jumps[0].0, "break");

    let program = parse("def m; next; end").unwrap();
    assert_eq!(program.invalid_jumps[0].0, "next");
}

#[test]
fn test_def_with_all_parameter_kinds() {
    match stmt("def foo(a, b = 1, *rest, &blk); end") {
        ExprKind::Def(def) => {
            assert_eq!(def.name, "foo");
            assert!(!def.singleton);
            assert_eq!(def.params.required, vec!["a".to_string()]);
            assert_eq!(def.params.optional.len(), 1);
            assert_eq!(def.params.rest.as_deref(), Some("rest"));
            assert_eq!(def.params.block.as_deref(), Some("blk"));
        }
        other => panic!("expected def, got {:?}", other),
    }
}

#[test]
fn test_def_names() {
    match stmt("def self.bar; end") {
        ExprKind::Def(def) => {
            assert!(def.singleton);
            assert_eq!(def.name, "bar");
        }
        other => panic!("expected def, got {:?}", other),
    }
    match stmt("def ==(other) true end") {
        ExprKind::Def(def) => assert_eq!(def.name, "=="),
        other => panic!("expected def, got {:?}", other),
    }
    match stmt("def value=(v); @v = v; end") {
        ExprKind::Def(def) => assert_eq!(def.name, "value="),
        other => panic!("expected def, got {:?}", other),
    }
}

#[test]
fn test_method_body_does_not_see_outer_locals() {
    match parse_with("def m; x; end", &["x"]).unwrap().body.remove(0).kind {
        ExprKind::Def(def) => {
            assert!(matches!(def.body.body[0].kind, ExprKind::Call(_)));
        }
        other => panic!("expected def, got {:?}", other),
    }
}

#[test]
fn test_class_with_superclass() {
    match stmt("class Foo < Bar\n  def x\n  end\nend") {
        ExprKind::Class(class) => {
            assert_eq!(class.name, "Foo");
            assert!(class.superclass.is_some());
            assert_eq!(class.body.len(), 1);
        }
        other => panic!("expected class, got {:?}", other),
    }
}

#[test]
fn test_module_body() {
    match stmt("module Util\n  def self.twice(x)\n    x * 2\n  end\nend") {
        ExprKind::Class(def) => {
            assert_eq!(def.name, "Util");
            assert!(def.module);
            assert!(def.superclass.is_none());
            assert_eq!(def.body.len(), 1);
        }
        other => panic!("expected module, got {:?}", other),
    }
}

#[test]
fn test_begin_rescue_else_ensure() {
    match stmt("begin; 1; rescue ArgumentError => e; 2; else; 3; ensure; 4; end") {
        ExprKind::Begin(block) => {
            assert_eq!(block.rescues.len(), 1);
            assert_eq!(block.rescues[0].classes.len(), 1);
            assert_eq!(block.rescues[0].var.as_deref(), Some("e"));
            assert!(block.else_body.is_some());
            assert!(block.ensure.is_some());
        }
        other => panic!("expected begin, got {:?}", other),
    }
}

#[test]
fn test_case_when() {
    let program = parse_with("case x\nwhen 1, 2 then :a\nelse :b\nend", &["x"]).unwrap();
    match &program.body[0].kind {
        ExprKind::Case {
            subject,
            whens,
            else_body,
        } => {
            assert!(subject.is_some());
            assert_eq!(whens.len(), 1);
            assert_eq!(whens[0].values.len(), 2);
            assert!(else_body.is_some());
        }
        other => panic!("expected case, got {:?}", other),
    }
}

#[test]
fn test_string_interpolation() {
    match stmt("\"a#{1 + 1}b\"") {
        ExprKind::Str(segments) => {
            assert_eq!(segments.len(), 3);
            assert!(matches!(&segments[1], StrSegment::Code(body) if body.len() == 1));
        }
        other => panic!("expected string, got {:?}", other),
    }
}

#[test]
fn test_index_and_attribute_assignment() {
    match parse_with("a[0] = 1", &["a"]).unwrap().body.remove(0).kind {
        ExprKind::Assign { target, .. } => assert!(matches!(*target, Target::Index { .. })),
        other => panic!("expected assignment, got {:?}", other),
    }
    match parse_with("a.size = 1", &["a"]).unwrap().body.remove(0).kind {
        ExprKind::Assign { target, .. } => {
            assert!(matches!(*target, Target::Attr { ref name, .. } if name == "size"))
        }
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn test_ranges_and_scoped_constants() {
    assert!(matches!(stmt("1..3"), ExprKind::Range { exclusive: false, .. }));
    assert!(matches!(stmt("1...3"), ExprKind::Range { exclusive: true, .. }));
    assert!(matches!(
        stmt("Foo::Bar"),
        ExprKind::Const { scope: Some(_), .. }
    ));
}

#[test]
fn test_and_or_not_keywords() {
    assert!(matches!(stmt("a and b"), ExprKind::And(..)));
    assert!(matches!(stmt("a or b"), ExprKind::Or(..)));
    assert!(matches!(stmt("not a"), ExprKind::Not(_)));
}
