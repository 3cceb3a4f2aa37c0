//! Byte transports the shell runs over

use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// A byte-oriented link with no line editing of its own.
pub trait Transport: Write {
    /// Block until a byte arrives. `Ok(None)` means the link closed.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

/// Host transport on the process's stdin and stdout
#[derive(Debug)]
pub struct StdioTransport {
    input: io::Stdin,
    output: io::Stdout,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            input: io::stdin(),
            output: io::stdout(),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for StdioTransport {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.input.lock().read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl Write for StdioTransport {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

/// Scripted transport for tests: input is queued up front, output is kept.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl MockTransport {
    pub fn new(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Queue more input behind what is already there.
    pub fn push_input(
        &mut self,
        input: impl AsRef<[u8]>,
    ) {
        self.input.extend(input.as_ref());
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Take everything written so far.
    pub fn take_output(&mut self) -> String {
        let text = self.output_text();
        self.output.clear();
        text
    }

    pub fn remaining_input(&self) -> usize {
        self.input.len()
    }
}

impl Transport for MockTransport {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }
}

impl Write for MockTransport {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_reads_in_order_then_closes() {
        let mut t = MockTransport::new("ab");
        assert_eq!(t.read_byte().unwrap(), Some(b'a'));
        t.push_input("c");
        assert_eq!(t.read_byte().unwrap(), Some(b'b'));
        assert_eq!(t.read_byte().unwrap(), Some(b'c'));
        assert_eq!(t.read_byte().unwrap(), None);
        assert_eq!(t.remaining_input(), 0);
    }

    #[test]
    fn test_mock_captures_output() {
        let mut t = MockTransport::default();
        write!(t, "> {}", 1).unwrap();
        assert_eq!(t.output(), b"> 1");
        assert_eq!(t.take_output(), "> 1");
        assert!(t.output().is_empty());
    }
}
