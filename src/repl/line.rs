//! Line framing over a raw transport, and the console output side
//!
//! The transport does no line editing, so the reader echoes what it
//! receives and decides where a line ends. Output goes through
//! [`Console`], which turns every `\n` into the configured line ending.

use super::transport::Transport;
use crate::util::config::{ShellConfig, CR, LF};
use std::io::{self, Write};
use tracing::{trace, warn};

/// Collects bytes from a transport into lines.
#[derive(Debug, Clone)]
pub struct LineReader {
    terminators: Vec<u8>,
    echo: bool,
    line_ending: String,
    max_line_len: usize,
    /// The previous line ended with CR, so a following LF belongs to it.
    after_cr: bool,
}

impl LineReader {
    pub fn new(config: &ShellConfig) -> Self {
        Self {
            terminators: config.terminators.clone(),
            echo: config.echo,
            line_ending: config.line_ending.clone(),
            max_line_len: config.max_line_len,
            after_cr: false,
        }
    }

    /// Read one line, without its terminator. Returns `Ok(None)` when the
    /// transport closes; a partial line is dropped then.
    pub fn read_line(
        &mut self,
        transport: &mut dyn Transport,
    ) -> io::Result<Option<String>> {
        let mut bytes = Vec::new();
        let mut overflowed = false;
        loop {
            let Some(byte) = transport.read_byte()? else {
                if !bytes.is_empty() {
                    trace!(len = bytes.len(), "transport closed mid-line");
                }
                return Ok(None);
            };
            let after_cr = std::mem::replace(&mut self.after_cr, false);
            if self.terminators.contains(&byte) {
                if byte == LF && after_cr && bytes.is_empty() {
                    continue;
                }
                self.after_cr = byte == CR;
                if self.echo {
                    transport.write_all(self.line_ending.as_bytes())?;
                    transport.flush()?;
                }
                break;
            }
            if bytes.len() >= self.max_line_len {
                if !overflowed {
                    warn!(max = self.max_line_len, "input line too long, dropping bytes");
                    overflowed = true;
                }
                continue;
            }
            bytes.push(byte);
            if self.echo {
                transport.write_all(&[byte])?;
            }
        }
        let line = String::from_utf8_lossy(&bytes).into_owned();
        trace!(line = %line, "line read");
        Ok(Some(line))
    }
}

/// Output side of the transport
pub struct Console<'a> {
    transport: &'a mut dyn Transport,
    line_ending: &'a str,
}

impl<'a> Console<'a> {
    pub fn new(
        transport: &'a mut dyn Transport,
        line_ending: &'a str,
    ) -> Self {
        Self {
            transport,
            line_ending,
        }
    }
}

impl Write for Console<'_> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        if self.line_ending == "\n" {
            self.transport.write_all(buf)?;
            return Ok(buf.len());
        }
        let mut pieces = buf.split(|b| *b == LF);
        if let Some(first) = pieces.next() {
            self.transport.write_all(first)?;
        }
        for piece in pieces {
            self.transport.write_all(self.line_ending.as_bytes())?;
            self.transport.write_all(piece)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.transport.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repl::transport::MockTransport;

    fn read_all(
        config: &ShellConfig,
        input: &str,
    ) -> (Vec<String>, String) {
        let mut transport = MockTransport::new(input);
        let mut reader = LineReader::new(config);
        let mut lines = Vec::new();
        while let Some(line) = reader.read_line(&mut transport).unwrap() {
            lines.push(line);
        }
        (lines, transport.output_text())
    }

    #[test]
    fn test_cr_terminates_and_echoes() {
        let (lines, echo) = read_all(&ShellConfig::default(), "1 + 1\rputs 2\r");
        assert_eq!(lines, vec!["1 + 1", "puts 2"]);
        assert_eq!(echo, "1 + 1\r\nputs 2\r\n");
    }

    #[test]
    fn test_lf_is_content_on_the_device() {
        let (lines, _) = read_all(&ShellConfig::default(), "a\nb\r");
        assert_eq!(lines, vec!["a\nb"]);
    }

    #[test]
    fn test_crlf_counts_once_when_both_terminate() {
        let config = ShellConfig::host();
        let (lines, echo) = read_all(&config, "x\r\ny\n\r\n");
        assert_eq!(lines, vec!["x", "y", ""]);
        assert_eq!(echo, "", "host preset does not echo");
    }

    #[test]
    fn test_partial_line_is_dropped_on_close() {
        let (lines, _) = read_all(&ShellConfig::default(), "done\rhalf");
        assert_eq!(lines, vec!["done"]);
    }

    #[test]
    fn test_overlong_line_is_truncated() {
        let config = ShellConfig {
            max_line_len: 4,
            ..ShellConfig::default()
        };
        let (lines, echo) = read_all(&config, "abcdefg\rok\r");
        assert_eq!(lines, vec!["abcd", "ok"]);
        assert_eq!(echo, "abcd\r\nok\r\n");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut transport = MockTransport::new(b"a\xffb\r");
        let mut reader = LineReader::new(&ShellConfig::default());
        let line = reader.read_line(&mut transport).unwrap().unwrap();
        assert_eq!(line, "a\u{fffd}b");
    }

    #[test]
    fn test_console_translates_newlines() {
        let mut transport = MockTransport::default();
        {
            let mut console = Console::new(&mut transport, "\r\n");
            write!(console, "one\ntwo\n\nthree").unwrap();
        }
        assert_eq!(transport.output_text(), "one\r\ntwo\r\n\r\nthree");
    }
}
