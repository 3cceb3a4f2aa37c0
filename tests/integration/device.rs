//! Device builtins driven through the shell

use ias::repl::{EngineFactory, MockTransport, Session};
use ias::runtime::board::{BoardEvent, Level, PinMode, STEP_PULSES, STEP_X_PIN};
use ias::runtime::{Interpreter, RecordingBoard};
use ias::ShellConfig;

fn session_with(board: &RecordingBoard) -> Session<Interpreter> {
    let board = board.clone();
    let factory: EngineFactory<Interpreter> =
        Box::new(move || Interpreter::new(Box::new(board.clone())));
    let config = ShellConfig {
        banner: false,
        ..ShellConfig::default()
    };
    Session::new(config, factory).unwrap()
}

#[test]
fn test_engine_brings_the_board_up() {
    let board = RecordingBoard::new();
    let _session = session_with(&board);
    assert_eq!(
        board.events()[..4],
        [
            BoardEvent::PinMode { pin: 13, mode: PinMode::Output },
            BoardEvent::PinMode { pin: 30, mode: PinMode::Output },
            BoardEvent::PinMode { pin: 31, mode: PinMode::Output },
            BoardEvent::Write { pin: 13, level: Level::Low },
        ]
    );
}

#[test]
fn test_blink_statement() {
    let board = RecordingBoard::new();
    let mut session = session_with(&board);
    board.clear();
    let mut transport = MockTransport::new(
        "3.times do\rdigital_write(13, HIGH)\rdelay(100)\rdigital_write(13, LOW)\rend\r",
    );
    session.run(&mut transport).unwrap();
    assert_eq!(board.writes_to(13), [Level::High, Level::Low].repeat(3));
    assert!(board.events().contains(&BoardEvent::Delay { micros: 100_000 }));
    assert!(transport.output_text().ends_with("end\r\n => 3\r\n> "));
}

#[test]
fn test_step_x_from_the_prompt() {
    let board = RecordingBoard::new();
    let mut session = session_with(&board);
    board.clear();
    let mut transport = MockTransport::new("step_x\r");
    session.run(&mut transport).unwrap();
    let writes = board.writes_to(STEP_X_PIN);
    assert_eq!(writes.len(), STEP_PULSES * 2);
    assert!(writes.chunks(2).all(|pair| pair == [Level::High, Level::Low]));
    assert_eq!(transport.output_text(), "> step_x\r\n => nil\r\n> ");
}

#[test]
fn test_bad_pin_is_a_script_error() {
    let board = RecordingBoard::new();
    let mut session = session_with(&board);
    let mut transport = MockTransport::new("digital_write(200, HIGH)\r");
    session.run(&mut transport).unwrap();
    assert!(transport.output_text().contains("invalid pin 200 (ArgumentError)"));
}

#[test]
fn test_reset_brings_the_board_up_again() {
    let board = RecordingBoard::new();
    let mut session = session_with(&board);
    board.clear();
    let mut transport = MockTransport::new("quit\r");
    session.run(&mut transport).unwrap();
    assert_eq!(board.writes_to(13), [Level::Low]);
}
