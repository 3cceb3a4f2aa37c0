//! End-to-end sessions over a scripted transport

use ias::repl::{EngineFactory, MockTransport, Session, BANNER};
use ias::runtime::{Interpreter, RecordingBoard};
use ias::ShellConfig;

fn quiet_config() -> ShellConfig {
    ShellConfig {
        banner: false,
        ..ShellConfig::default()
    }
}

fn factory() -> EngineFactory<Interpreter> {
    Box::new(|| Interpreter::new(Box::new(RecordingBoard::new())))
}

/// Run `input` through a fresh device-style session and return the transcript.
fn transcript(input: &str) -> String {
    let mut session = Session::new(quiet_config(), factory()).unwrap();
    let mut transport = MockTransport::new(input);
    session.run(&mut transport).unwrap();
    transport.output_text()
}

#[test]
fn test_banner_then_prompt() {
    let mut session = Session::new(ShellConfig::default(), factory()).unwrap();
    let mut transport = MockTransport::new("");
    session.run(&mut transport).unwrap();
    let expected = format!("{}> ", BANNER).replace('\n', "\r\n");
    assert_eq!(transport.output_text(), expected);
    assert!(expected.contains("IAS - Interactive Arduino Shell\r\n"));
    assert!(expected.starts_with("\r\n\r\n\r\n"));
}

#[test]
fn test_simple_statement() {
    assert_eq!(transcript("1 + 1\r"), "> 1 + 1\r\n => 2\r\n> ");
}

#[test]
fn test_puts_prints_then_shows_its_argument() {
    assert_eq!(transcript("puts \"hi\"\r"), "> puts \"hi\"\r\nhi\r\n => \"hi\"\r\n> ");
}

#[test]
fn test_continuation_prompt() {
    assert_eq!(
        transcript("if true\r:yes\rend\r"),
        "> if true\r\n* :yes\r\n* end\r\n => :yes\r\n> "
    );
}

#[test]
fn test_module_block_stays_open() {
    assert_eq!(
        transcript("module Led\rdef self.pin; 13; end\rend\rLed.pin\r"),
        "> module Led\r\n* def self.pin; 13; end\r\n* end\r\n => :pin\r\n> Led.pin\r\n => 13\r\n> "
    );
}

#[test]
fn test_backslash_continues_the_statement() {
    assert_eq!(
        transcript("x = 1 + \\\r2\rx\r"),
        "> x = 1 + \\\r\n* 2\r\n => 3\r\n> x\r\n => 3\r\n> "
    );
}

#[test]
fn test_syntax_error_line() {
    assert_eq!(
        transcript("end\r"),
        "> end\r\nSyntax Error: syntax error, unexpected 'end'\r\n> "
    );
}

#[test]
fn test_exception_printed_without_prefix() {
    assert_eq!(
        transcript("raise ArgumentError, 'bad'\r"),
        "> raise ArgumentError, 'bad'\r\nbad (ArgumentError)\r\n> "
    );
    assert_eq!(transcript("break\r"), "> break\r\nInvalid break (SyntaxError)\r\n> ");
}

#[test]
fn test_exit_rebuilds_and_greets_again() {
    let config = ShellConfig::default();
    let mut session = Session::new(config, factory()).unwrap();
    let mut transport = MockTransport::new("a = 1\rquit\ra\r");
    session.run(&mut transport).unwrap();
    let out = transport.output_text();
    assert_eq!(out.matches("IAS - Interactive Arduino Shell").count(), 2);
    assert!(out.contains("quit\r\nBye!\r\n"));
    assert!(out.contains("undefined local variable or method 'a'"));
    assert_eq!(session.resets(), 1);
}

#[test]
fn test_open_statement_dropped_when_link_closes() {
    let mut session = Session::new(quiet_config(), factory()).unwrap();
    let mut transport = MockTransport::new("def f\r");
    session.run(&mut transport).unwrap();
    assert_eq!(transport.output_text(), "> def f\r\n* ");
    assert_eq!(session.pending(), "");
}

#[test]
fn test_host_preset() {
    let config = ShellConfig {
        banner: false,
        ..ShellConfig::host()
    };
    let mut session = Session::new(config, factory()).unwrap();
    let mut transport = MockTransport::new("x = [1,\r\n2]\r\nx.sum\n");
    session.run(&mut transport).unwrap();
    assert_eq!(transport.output_text(), "> *  => [1, 2]\n>  => 3\n> ");
}

#[test]
fn test_script_output_uses_line_ending() {
    assert_eq!(
        transcript("puts 1, 2\r"),
        "> puts 1, 2\r\n1\r\n2\r\n => [1, 2]\r\n> "
    );
}
