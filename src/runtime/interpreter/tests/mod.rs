//! Interpreter tests, plus the helpers the builtin tests share

use super::*;
use crate::runtime::board::RecordingBoard;

/// Fresh interpreter and a handle on its board's event log
pub(crate) fn engine() -> (Interpreter, RecordingBoard) {
    let board = RecordingBoard::new();
    let interp = Interpreter::new(Box::new(board.clone())).unwrap();
    (interp, board)
}

/// Run `src` and return the inspected result. Panics if it raises.
pub(crate) fn run_ok(
    interp: &mut Interpreter,
    src: &str,
) -> String {
    let mut out = Vec::new();
    match interp.run(src, &mut out) {
        RunOutcome::Returned(value) => interp.inspect_value(&value, &mut out).unwrap(),
        RunOutcome::Raised(exc) => {
            let text = interp.inspect_value(&exc, &mut out).unwrap_or_default();
            panic!("{:?} raised {}", src, text)
        }
    }
}

/// Run `src` and return the inspected exception. Panics if it returns.
pub(crate) fn run_err(
    interp: &mut Interpreter,
    src: &str,
) -> String {
    let mut out = Vec::new();
    match interp.run(src, &mut out) {
        RunOutcome::Raised(exc) => interp.inspect_value(&exc, &mut out).unwrap(),
        RunOutcome::Returned(value) => {
            let text = interp.inspect_value(&value, &mut out).unwrap_or_default();
            panic!("{:?} returned {}", src, text)
        }
    }
}

pub(crate) fn eval(src: &str) -> String {
    let (mut interp, _) = engine();
    run_ok(&mut interp, src)
}

pub(crate) fn eval_err(src: &str) -> String {
    let (mut interp, _) = engine();
    run_err(&mut interp, src)
}

/// Everything the script printed
pub(crate) fn eval_output(src: &str) -> String {
    let (mut interp, _) = engine();
    let mut out = Vec::new();
    let _ = interp.run(src, &mut out);
    String::from_utf8(out).unwrap()
}

// =====================================================================
// Control flow
// =====================================================================

#[test]
fn test_conditionals() {
    assert_eq!(eval("if 1 > 2 then :a elsif 2 > 1 then :b else :c end"), ":b");
    assert_eq!(eval("unless nil then 1 else 2 end"), "1");
    assert_eq!(eval("x = 5; x > 3 ? 'big' : 'small'"), "\"big\"");
    assert_eq!(eval(":y if false"), "nil");
    assert_eq!(eval("nil || false || 3"), "3");
    assert_eq!(eval("1 && nil"), "nil");
}

#[test]
fn test_loops() {
    assert_eq!(eval("i = 0; s = 0; while i < 5; s += i; i += 1; end; s"), "10");
    assert_eq!(eval("i = 0; until i >= 3 do i += 1 end; i"), "3");
    assert_eq!(eval("i = 0; i += 1 while i < 7; i"), "7");
    assert_eq!(eval("i = 0; loop { i += 1; break i * 2 if i == 4 }"), "8");
    assert_eq!(
        eval("r = []; [1, 2, 3, 4].each { |x| next if x.even?; r << x }; r"),
        "[1, 3]"
    );
}

#[test]
fn test_case_when() {
    let src = "def kind(v)
      case v
      when Integer then :int
      when 'a', 'b' then :letter
      when 1.0..2.0 then :small_float
      when /z+/ then :zs
      else :other
      end
    end
    [kind(4), kind('b'), kind(1.5), kind('zzz'), kind(nil)]";
    assert_eq!(eval(src), "[:int, :letter, :small_float, :zs, :other]");
}

#[test]
fn test_string_interpolation() {
    assert_eq!(eval("n = 3; \"#{n} * 2 = #{n * 2}\""), "\"3 * 2 = 6\"");
    assert_eq!(eval("'no #{interp}'"), "\"no \\#{interp}\"");
}

#[test]
fn test_output_goes_to_console() {
    assert_eq!(eval_output("puts 1, [2, [3]]; print 'a', 'b'; p :c"), "1\n2\n3\nab:c\n");
}

// =====================================================================
// Methods and classes
// =====================================================================

#[test]
fn test_method_parameters() {
    let src = "def f(a, b = 2, *rest, &blk)
      [a, b, rest, blk ? blk.call : nil]
    end
    [f(1), f(1, 3, 4, 5), f(0) { :blk }]";
    assert_eq!(eval(src), "[[1, 2, [], nil], [1, 3, [4, 5], nil], [0, 2, [], :blk]]");
    assert_eq!(
        eval_err("def g(a); end; g"),
        "wrong number of arguments (given 0, expected 1) (ArgumentError)"
    );
}

#[test]
fn test_yield_and_block_given() {
    assert_eq!(eval("def twice; [yield(1), yield(2)]; end; twice { |x| x * 10 }"), "[10, 20]");
    assert_eq!(eval("def maybe; if block_given? then yield else :none end; end; maybe"), ":none");
    assert_eq!(eval_err("def y; yield; end; y"), "no block given (yield) (LocalJumpError)");
}

#[test]
fn test_break_from_block_returns_from_call() {
    assert_eq!(eval("[1, 2, 3].each { |x| break x * 100 if x == 2 }"), "200");
}

#[test]
fn test_classes_and_inheritance() {
    let src = "class Animal
      def initialize(name); @name = name; end
      def speak; \"#{@name} makes #{sound}\"; end
      def sound; 'noise'; end
    end
    class Dog < Animal
      def sound; 'woof'; end
      def speak; \"#{super}!\"; end
    end
    [Dog.new('rex').speak, Dog.superclass, Dog.new('a').is_a?(Animal)]";
    assert_eq!(eval(src), "[\"rex makes woof!\", Animal, true]");
}

#[test]
fn test_reopening_and_class_methods() {
    let src = "class Counter
      def self.start; new(0); end
      def initialize(n); @n = n; end
      attr_reader :n
    end
    class Counter
      def bump; @n += 1; self; end
    end
    Counter.start.bump.bump.n";
    assert_eq!(eval(src), "2");
}

#[test]
fn test_module_holds_module_functions() {
    let (mut interp, _) = engine();
    run_ok(&mut interp, "module Pins\n  def self.led; 13; end\nend");
    assert_eq!(run_ok(&mut interp, "Pins.led"), "13");
    assert_eq!(run_ok(&mut interp, "module Pins; def self.motor; 30; end; end; Pins.motor"), "30");
    assert_eq!(
        run_err(&mut interp, "Pins.new"),
        "undefined method 'new' for module Pins (NoMethodError)"
    );
    assert_eq!(run_err(&mut interp, "class Pins; end"), "Pins is not a class (TypeError)");
    assert_eq!(run_err(&mut interp, "class Led < Pins; end"), "superclass must be a Class (TypeError)");
}

#[test]
fn test_method_missing_names_the_receiver() {
    assert_eq!(
        eval_err("5.frobnicate"),
        "undefined method 'frobnicate' for an instance of Integer (NoMethodError)"
    );
    assert!(eval_err("undefined_thing").contains("(NameError)"));
}

// =====================================================================
// Exceptions
// =====================================================================

#[test]
fn test_rescue_else_ensure() {
    let src = "log = []
    begin
      log << :body
      raise ArgumentError, 'bad'
    rescue TypeError
      log << :type
    rescue ArgumentError => e
      log << e.message
    else
      log << :else
    ensure
      log << :ensure
    end
    log";
    assert_eq!(eval(src), "[:body, \"bad\", :ensure]");
    assert_eq!(
        eval("log = []; begin; log << 1; rescue; log << 2; else; log << 3; end; log"),
        "[1, 3]"
    );
}

#[test]
fn test_rescue_modifier_and_custom_errors() {
    assert_eq!(eval("x = (raise 'no') rescue :saved; x"), ":saved");
    let src = "class AppError < StandardError; end
    begin
      raise AppError, 'custom'
    rescue StandardError => e
      [e.class, e.message]
    end";
    assert_eq!(eval(src), "[AppError, \"custom\"]");
}

#[test]
fn test_ensure_runs_when_unwinding() {
    let src = "$log = []
    def risky
      begin
        raise 'x'
      ensure
        $log << :cleaned
      end
    end
    begin; risky; rescue; end
    $log";
    assert_eq!(eval(src), "[:cleaned]");
}

#[test]
fn test_bang_global_only_inside_rescue() {
    assert_eq!(eval("begin; raise 'e'; rescue; $!.message; end"), "\"e\"");
    assert_eq!(eval("begin; raise 'e'; rescue; end; $!"), "nil");
}

#[test]
fn test_syntax_error_is_raised_not_panicked() {
    assert!(eval_err("def (").ends_with("(SyntaxError)"));
    assert_eq!(eval_err("break"), "Invalid break (SyntaxError)");
}

// =====================================================================
// Persistence and limits
// =====================================================================

#[test]
fn test_state_persists_between_runs() {
    let (mut interp, _) = engine();
    run_ok(&mut interp, "a = 10");
    run_ok(&mut interp, "def twice(x); x * 2; end");
    run_ok(&mut interp, "$g = :global");
    run_ok(&mut interp, "class Pt; attr_accessor :x; end");
    assert_eq!(run_ok(&mut interp, "twice(a)"), "20");
    assert_eq!(run_ok(&mut interp, "$g"), ":global");
    assert_eq!(run_ok(&mut interp, "pt = Pt.new; pt.x = a; pt.x"), "10");
    assert!(interp.top_level_locals().contains("a"));
    assert!(interp.top_level_locals().contains("pt"));
    assert!(matches!(interp.local("a"), Some(Value::Int(10))));
}

#[test]
fn test_failed_run_keeps_earlier_state() {
    let (mut interp, _) = engine();
    run_ok(&mut interp, "items = [1]");
    run_err(&mut interp, "items << 2; raise 'stop'; items << 3");
    assert_eq!(run_ok(&mut interp, "items"), "[1, 2]");
    run_err(&mut interp, "items.push(");
    assert_eq!(run_ok(&mut interp, "items.size"), "2");
}

#[test]
fn test_deep_recursion_raises() {
    let (mut interp, _) = engine();
    interp.set_max_depth(16);
    assert_eq!(interp.max_depth(), 16);
    assert_eq!(
        run_err(&mut interp, "def down(n); down(n + 1); end; down(0)"),
        "stack level too deep (SystemStackError)"
    );
    assert_eq!(run_ok(&mut interp, "def fact(n); n <= 1 ? 1 : n * fact(n - 1); end; fact(10)"), "3628800");
}

#[test]
fn test_display_string_uses_to_s() {
    let (mut interp, _) = engine();
    let mut out = Vec::new();
    let RunOutcome::Returned(value) = interp.run("'text'", &mut out) else {
        panic!("raised");
    };
    assert_eq!(interp.display_string(&value), "text");
    assert_eq!(interp.inspect_value(&value, &mut out).as_deref(), Some("\"text\""));
}

#[test]
fn test_inspect_without_method_is_none() {
    let (mut interp, _) = engine();
    let mut out = Vec::new();
    let RunOutcome::Returned(value) = interp.run(
        "class Quiet < BasicObject; end; Quiet.new",
        &mut out,
    ) else {
        panic!("raised");
    };
    assert_eq!(interp.inspect_value(&value, &mut out), None);
    assert_eq!(interp.display_string(&value), "#<Quiet>");
}
