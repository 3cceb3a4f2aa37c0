//! GPIO board abstraction used by the device builtins

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use tracing::trace;

/// Highest digital pin number accepted
pub const MAX_PIN: u32 = 69;

/// Status LED
pub const LED_PIN: u8 = 13;
/// Step outputs driven by `step_x` and `step_y`
pub const STEP_X_PIN: u8 = 30;
pub const STEP_Y_PIN: u8 = 31;

/// Pulses per step command
pub const STEP_PULSES: usize = 100;
/// Half period of one step pulse, in microseconds
pub const STEP_HALF_PERIOD_US: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
    InputPullup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl fmt::Display for Level {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Level::Low => write!(f, "LOW"),
            Level::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("invalid pin {0}")]
    InvalidPin(i64),
}

/// Digital I/O and timing
pub trait Board {
    fn pin_mode(
        &mut self,
        pin: u8,
        mode: PinMode,
    ) -> Result<(), BoardError>;

    fn digital_write(
        &mut self,
        pin: u8,
        level: Level,
    ) -> Result<(), BoardError>;

    fn delay_us(
        &mut self,
        micros: u64,
    );
}

/// Range-check a script-supplied pin number
pub fn check_pin(pin: i64) -> Result<u8, BoardError> {
    u8::try_from(pin)
        .ok()
        .filter(|p| u32::from(*p) <= MAX_PIN)
        .ok_or(BoardError::InvalidPin(pin))
}

/// Pin setup done once per engine: status LED and step outputs are
/// outputs, the LED starts off.
pub fn bring_up(board: &mut dyn Board) -> Result<(), BoardError> {
    board.pin_mode(LED_PIN, PinMode::Output)?;
    board.pin_mode(STEP_X_PIN, PinMode::Output)?;
    board.pin_mode(STEP_Y_PIN, PinMode::Output)?;
    board.digital_write(LED_PIN, Level::Low)?;
    Ok(())
}

/// Drive `pin` through one step command.
pub fn pulse(
    board: &mut dyn Board,
    pin: u8,
) -> Result<(), BoardError> {
    for _ in 0..STEP_PULSES {
        board.digital_write(pin, Level::High)?;
        board.delay_us(STEP_HALF_PERIOD_US);
        board.digital_write(pin, Level::Low)?;
        board.delay_us(STEP_HALF_PERIOD_US);
    }
    Ok(())
}

/// Host board: logs pin activity at trace level, does not sleep.
#[derive(Debug, Default)]
pub struct LoggingBoard;

impl Board for LoggingBoard {
    fn pin_mode(
        &mut self,
        pin: u8,
        mode: PinMode,
    ) -> Result<(), BoardError> {
        check_pin(i64::from(pin))?;
        trace!(pin, ?mode, "pin_mode");
        Ok(())
    }

    fn digital_write(
        &mut self,
        pin: u8,
        level: Level,
    ) -> Result<(), BoardError> {
        check_pin(i64::from(pin))?;
        trace!(pin, %level, "digital_write");
        Ok(())
    }

    fn delay_us(
        &mut self,
        micros: u64,
    ) {
        trace!(micros, "delay");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEvent {
    PinMode { pin: u8, mode: PinMode },
    Write { pin: u8, level: Level },
    Delay { micros: u64 },
}

/// Test board that records every call. Clones share one event log, so a
/// test can keep a handle after giving the board to an engine.
#[derive(Debug, Clone, Default)]
pub struct RecordingBoard {
    events: Rc<RefCell<Vec<BoardEvent>>>,
}

impl RecordingBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BoardEvent> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// Levels written to `pin`, in order
    pub fn writes_to(
        &self,
        pin: u8,
    ) -> Vec<Level> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                BoardEvent::Write { pin: p, level } if *p == pin => Some(*level),
                _ => None,
            })
            .collect()
    }
}

impl Board for RecordingBoard {
    fn pin_mode(
        &mut self,
        pin: u8,
        mode: PinMode,
    ) -> Result<(), BoardError> {
        check_pin(i64::from(pin))?;
        self.events.borrow_mut().push(BoardEvent::PinMode { pin, mode });
        Ok(())
    }

    fn digital_write(
        &mut self,
        pin: u8,
        level: Level,
    ) -> Result<(), BoardError> {
        check_pin(i64::from(pin))?;
        self.events.borrow_mut().push(BoardEvent::Write { pin, level });
        Ok(())
    }

    fn delay_us(
        &mut self,
        micros: u64,
    ) {
        self.events.borrow_mut().push(BoardEvent::Delay { micros });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bring_up_sequence() {
        let mut board = RecordingBoard::new();
        bring_up(&mut board).unwrap();
        assert_eq!(
            board.events(),
            vec![
                BoardEvent::PinMode { pin: 13, mode: PinMode::Output },
                BoardEvent::PinMode { pin: 30, mode: PinMode::Output },
                BoardEvent::PinMode { pin: 31, mode: PinMode::Output },
                BoardEvent::Write { pin: 13, level: Level::Low },
            ]
        );
    }

    #[test]
    fn test_pulse_timing() {
        let mut board = RecordingBoard::new();
        pulse(&mut board, STEP_X_PIN).unwrap();
        let events = board.events();
        assert_eq!(events.len(), STEP_PULSES * 4);
        assert_eq!(events[0], BoardEvent::Write { pin: 30, level: Level::High });
        assert_eq!(events[1], BoardEvent::Delay { micros: 3000 });
        assert_eq!(events[2], BoardEvent::Write { pin: 30, level: Level::Low });
        assert_eq!(board.writes_to(30).len(), 200);
    }

    #[test]
    fn test_check_pin() {
        assert_eq!(check_pin(13), Ok(13));
        assert_eq!(check_pin(70), Err(BoardError::InvalidPin(70)));
        assert_eq!(check_pin(-1), Err(BoardError::InvalidPin(-1)));
    }
}
