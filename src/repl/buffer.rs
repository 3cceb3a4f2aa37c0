//! Pending statement text

use std::fmt;

/// Source collected for the statement in progress: the typed lines joined
/// by `\n`, or empty when no statement is open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementBuffer {
    text: String,
    lines: usize,
}

impl StatementBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        line: &str,
    ) {
        if self.lines > 0 {
            self.text.push('\n');
        }
        self.text.push_str(line);
        self.lines += 1;
    }

    pub fn reset(&mut self) {
        self.text.clear();
        self.lines = 0;
    }

    /// No statement is open. A statement made of one empty line is still open.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Lines appended since the last reset
    #[inline]
    pub fn line_count(&self) -> usize {
        self.lines
    }
}

impl fmt::Display for StatementBuffer {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_joined_with_newlines() {
        let mut buf = StatementBuffer::new();
        buf.append("if true");
        buf.append("");
        buf.append("end");
        assert_eq!(buf.as_str(), "if true\n\nend");
        assert_eq!(buf.line_count(), 3);
    }

    #[test]
    fn test_reset_starts_over() {
        let mut buf = StatementBuffer::new();
        buf.append("1 +");
        buf.reset();
        assert!(buf.is_empty());
        buf.append("2");
        assert_eq!(buf.to_string(), "2");
    }

    #[test]
    fn test_empty_first_line_opens_a_statement() {
        let mut buf = StatementBuffer::new();
        buf.append("");
        assert!(!buf.is_empty());
        buf.append("x");
        assert_eq!(buf.as_str(), "\nx");
    }
}
