//! Proc and lambda objects

use crate::runtime::class::CoreClasses;
use crate::runtime::interpreter::{EvalResult, Exec};
use crate::runtime::value::{Args, ProcBody, ProcValue, Value};
use std::rc::Rc;

pub fn register(core: &CoreClasses) {
    let proc = &core.proc_class;
    proc.define_native("call", proc_call);
    proc.define_native("()", proc_call);
    proc.define_native("yield", proc_call);
    proc.define_native("[]", proc_call);
    proc.define_native("===", proc_call);
    proc.define_native("to_proc", |_, recv, _, _| Ok(recv.clone()));
    proc.define_native("lambda?", |exec, recv, _, _| {
        let proc = proc_of(exec, recv)?;
        Ok(Value::Bool(proc.lambda))
    });
    proc.define_native("arity", |exec, recv, _, _| {
        let proc = proc_of(exec, recv)?;
        Ok(Value::Int(arity(&proc)))
    });
    proc.define_native("inspect", proc_inspect);
    proc.define_native("to_s", proc_inspect);
}

fn proc_of(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<Rc<ProcValue>> {
    match value {
        Value::Proc(proc) => Ok(proc.clone()),
        other => {
            let class = exec.class_of(other);
            exec.raise("TypeError", format!("wrong argument type {} (expected Proc)", class.name))
        }
    }
}

fn proc_call(
    exec: &mut Exec<'_>,
    recv: &Value,
    args: Args,
    block: Option<Value>,
) -> EvalResult<Value> {
    let proc = proc_of(exec, recv)?;
    exec.call_proc(&proc, args, block)
}

/// Required parameter count, negated and offset by one when optional or
/// rest parameters make the count open-ended.
fn arity(proc: &ProcValue) -> i64 {
    let ProcBody::Block { def, .. } = &proc.body else {
        return -2;
    };
    let params = &def.params;
    let required = params.required.len() as i64;
    if params.rest.is_some() || !params.optional.is_empty() {
        -(required + 1)
    } else {
        required
    }
}

fn proc_inspect(
    exec: &mut Exec<'_>,
    recv: &Value,
    _args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    let proc = proc_of(exec, recv)?;
    let suffix = if proc.lambda { " (lambda)" } else { "" };
    Ok(Value::str(format!("#<Proc:0x{:08x}{}>", proc.tag, suffix)))
}

#[cfg(test)]
mod tests {
    use crate::runtime::interpreter::tests::{eval, eval_err};

    #[test]
    fn test_call_forms() {
        assert_eq!(eval("sq = lambda { |x| x * x }; [sq.call(3), sq.(4), sq[5]]"), "[9, 16, 25]");
        assert_eq!(eval("add = proc { |a, b| a.to_i + b.to_i }; add.call(1)"), "1");
        assert_eq!(eval("pr = Proc.new { |x| x }; pr.yield(7)"), "7");
    }

    #[test]
    fn test_lambda_checks_arguments() {
        assert_eq!(
            eval_err("lambda { |x| x }.call"),
            "wrong number of arguments (given 0, expected 1) (ArgumentError)"
        );
        assert_eq!(eval("proc { |x| x }.call"), "nil");
        assert_eq!(eval("proc { |a, b| [a, b] }.call([1, 2])"), "[1, 2]");
    }

    #[test]
    fn test_arity_and_kind() {
        assert_eq!(eval("proc { |x, y| }.arity"), "2");
        assert_eq!(eval("proc { |x = 1| }.arity"), "-1");
        assert_eq!(eval("lambda { |x, y = 1| }.arity"), "-2");
        assert_eq!(eval("lambda { |*a| }.arity"), "-1");
        assert_eq!(eval("lambda { }.lambda?"), "true");
        assert_eq!(eval("proc { }.lambda?"), "false");
    }

    #[test]
    fn test_closures_capture_variables() {
        assert_eq!(eval("n = 0; inc = lambda { n += 1 }; inc.call; inc.call; n"), "2");
        assert_eq!(
            eval("def make(k); lambda { |x| x * k }; end; triple = make(3); triple.call(5)"),
            "15"
        );
    }

    #[test]
    fn test_return_in_lambda_stays_local() {
        assert_eq!(eval("def m; l = lambda { return 1 }; l.call; 2; end; m"), "2");
        assert_eq!(eval("def m; [1, 2].each { |x| return x * 10 }; 0; end; m"), "10");
    }

    #[test]
    fn test_case_equality_calls() {
        assert_eq!(eval("even = lambda { |x| x.even? }; case 4 when even then :even else :odd end"), ":even");
    }
}
