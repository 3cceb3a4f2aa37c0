//! Device builtins: digital pins, delays and the step outputs
//!
//! Pin modes and levels use the Arduino numbering, so scripts written
//! for the firmware (`pin_mode(13, OUTPUT)`) run unchanged.

use super::expect_int;
use crate::runtime::board::{self, BoardError, Level, PinMode, STEP_X_PIN, STEP_Y_PIN};
use crate::runtime::class::CoreClasses;
use crate::runtime::interpreter::{EvalResult, Exec};
use crate::runtime::value::{Args, Value};
use indexmap::IndexMap;
use tracing::trace;

pub const LOW: i64 = 0;
pub const HIGH: i64 = 1;
pub const INPUT: i64 = 0;
pub const OUTPUT: i64 = 1;
pub const INPUT_PULLUP: i64 = 2;

pub fn register(
    core: &CoreClasses,
    constants: &mut IndexMap<String, Value>,
) {
    for (name, value) in [
        ("LOW", LOW),
        ("HIGH", HIGH),
        ("INPUT", INPUT),
        ("OUTPUT", OUTPUT),
        ("INPUT_PULLUP", INPUT_PULLUP),
    ] {
        constants.insert(name.to_string(), Value::Int(value));
    }

    let object = &core.object;
    object.define_native("pin_mode", device_pin_mode);
    object.define_native("digital_write", device_digital_write);
    object.define_native("delay", |exec, _, args, _| sleep(exec, &args, 1000));
    object.define_native("delay_microseconds", |exec, _, args, _| sleep(exec, &args, 1));
    object.define_native("step_x", |exec, _, args, _| step(exec, &args, STEP_X_PIN));
    object.define_native("step_y", |exec, _, args, _| step(exec, &args, STEP_Y_PIN));
}

fn board_result(
    exec: &Exec<'_>,
    result: Result<(), BoardError>,
) -> EvalResult<Value> {
    match result {
        Ok(()) => Ok(Value::Nil),
        Err(e) => exec.raise("ArgumentError", e.to_string()),
    }
}

fn pin_arg(
    exec: &Exec<'_>,
    value: &Value,
) -> EvalResult<u8> {
    let pin = expect_int(exec, value)?;
    match board::check_pin(pin) {
        Ok(pin) => Ok(pin),
        Err(e) => exec.raise("ArgumentError", e.to_string()),
    }
}

fn device_pin_mode(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 2, Some(2))?;
    let pin = pin_arg(exec, &args[0])?;
    let mode = match expect_int(exec, &args[1])? {
        INPUT => PinMode::Input,
        OUTPUT => PinMode::Output,
        INPUT_PULLUP => PinMode::InputPullup,
        other => return exec.raise("ArgumentError", format!("invalid pin mode {}", other)),
    };
    let result = exec.interp.board.pin_mode(pin, mode);
    board_result(exec, result)
}

/// Any nonzero level (or `true`) drives the pin high.
fn device_digital_write(
    exec: &mut Exec<'_>,
    _recv: &Value,
    args: Args,
    _block: Option<Value>,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 2, Some(2))?;
    let pin = pin_arg(exec, &args[0])?;
    let level = match &args[1] {
        Value::Bool(true) => Level::High,
        Value::Bool(false) | Value::Nil => Level::Low,
        other if expect_int(exec, other)? == LOW => Level::Low,
        _ => Level::High,
    };
    let result = exec.interp.board.digital_write(pin, level);
    board_result(exec, result)
}

fn sleep(
    exec: &mut Exec<'_>,
    args: &Args,
    scale: u64,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 1, Some(1))?;
    let amount = expect_int(exec, &args[0])?;
    let Ok(amount) = u64::try_from(amount) else {
        return exec.raise("ArgumentError", format!("negative delay {}", amount));
    };
    let micros = amount.saturating_mul(scale);
    trace!(micros, "script delay");
    exec.interp.board.delay_us(micros);
    Ok(Value::Nil)
}

fn step(
    exec: &mut Exec<'_>,
    args: &Args,
    pin: u8,
) -> EvalResult<Value> {
    exec.check_args(args.len(), 0, Some(0))?;
    let result = board::pulse(exec.interp.board.as_mut(), pin);
    board_result(exec, result)
}

#[cfg(test)]
mod tests {
    use crate::runtime::board::{BoardEvent, Level, PinMode, STEP_PULSES};
    use crate::runtime::interpreter::tests::{engine, eval, eval_err, run_ok};

    #[test]
    fn test_constants() {
        assert_eq!(eval("[HIGH, LOW, OUTPUT, INPUT, INPUT_PULLUP]"), "[1, 0, 1, 0, 2]");
    }

    #[test]
    fn test_pin_mode_and_write() {
        let (mut interp, board) = engine();
        board.clear();
        assert_eq!(run_ok(&mut interp, "pin_mode(7, OUTPUT)"), "nil");
        run_ok(&mut interp, "digital_write(7, HIGH); digital_write(7, LOW)");
        assert_eq!(
            board.events(),
            vec![
                BoardEvent::PinMode { pin: 7, mode: PinMode::Output },
                BoardEvent::Write { pin: 7, level: Level::High },
                BoardEvent::Write { pin: 7, level: Level::Low },
            ]
        );
    }

    #[test]
    fn test_delays_are_scaled() {
        let (mut interp, board) = engine();
        board.clear();
        run_ok(&mut interp, "delay(5); delay_microseconds(7)");
        assert_eq!(
            board.events(),
            vec![BoardEvent::Delay { micros: 5000 }, BoardEvent::Delay { micros: 7 }]
        );
    }

    #[test]
    fn test_step_x_pulses_pin_30() {
        let (mut interp, board) = engine();
        board.clear();
        assert_eq!(run_ok(&mut interp, "step_x"), "nil");
        let writes = board.writes_to(30);
        assert_eq!(writes.len(), STEP_PULSES * 2);
        assert_eq!(writes[0], Level::High);
        assert_eq!(writes[1], Level::Low);
        assert!(board.writes_to(31).is_empty());
        run_ok(&mut interp, "step_y");
        assert_eq!(board.writes_to(31).len(), STEP_PULSES * 2);
    }

    #[test]
    fn test_bad_arguments() {
        assert_eq!(eval_err("pin_mode(99, OUTPUT)"), "invalid pin 99 (ArgumentError)");
        assert_eq!(eval_err("pin_mode(3, 7)"), "invalid pin mode 7 (ArgumentError)");
        assert_eq!(eval_err("delay(-1)"), "negative delay -1 (ArgumentError)");
        assert_eq!(
            eval_err("step_x(1)"),
            "wrong number of arguments (given 1, expected 0) (ArgumentError)"
        );
    }
}
