//! Incremental splitting of child output into lines.

/// Splits a byte stream into lines on `\n`, `\r` and `\r\n`.
///
/// A bare carriage return ends a line, which turns terminal redraws such as
/// `"12/300\x1b[K\r"` into one line each. Bytes are decoded lossily.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
    after_cr: bool,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return every line it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if self.after_cr {
                self.after_cr = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => lines.push(self.take_line()),
                b'\r' => {
                    lines.push(self.take_line());
                    self.after_cr = true;
                }
                _ => self.pending.push(byte),
            }
        }
        lines
    }

    /// Flush an unterminated trailing fragment at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take_line())
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_newline() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.feed(b"a\nb\n"), vec!["a", "b"]);
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_crlf_is_one_terminator_even_across_chunks() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.feed(b"one\r"), vec!["one"]);
        assert_eq!(splitter.feed(b"\ntwo\r\n"), vec!["two"]);
    }

    #[test]
    fn test_bare_carriage_return_ends_a_line() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.feed(b"1/3\x1b[K\r2/3\x1b[K\rdone\n");
        assert_eq!(lines, vec!["1/3\u{1b}[K", "2/3\u{1b}[K", "done"]);
    }

    #[test]
    fn test_partial_line_is_held_until_terminated() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.feed(b"hel").is_empty());
        assert_eq!(splitter.feed(b"lo\nwor"), vec!["hello"]);
        assert_eq!(splitter.finish(), Some("wor".to_string()));
    }

    #[test]
    fn test_empty_lines_are_kept() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.feed(b"\n\nx\n"), vec!["", "", "x"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.feed(b"ok \xff\n");
        assert_eq!(lines, vec!["ok \u{fffd}"]);
    }
}
