//! Operator secret prompt on stdin.

use std::io::{self, BufRead, Write};

use radar_traits::{AuthPrompt, BoxError};

/// Asks on stderr, reads one line. The activation gate trims the answer.
pub struct StdinPrompt {
    reader: Box<dyn BufRead>,
}

impl StdinPrompt {
    pub fn new() -> Self {
        Self::from_reader(io::stdin().lock())
    }

    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }
}

impl Default for StdinPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthPrompt for StdinPrompt {
    fn obtain_secret(&mut self) -> Result<String, BoxError> {
        let mut err = io::stderr().lock();
        write!(err, "Enter activation secret: ")?;
        err.flush()?;
        drop(err);

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err("stdin closed before a secret was entered".into());
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_first_line_only() {
        let mut p = StdinPrompt::from_reader(Cursor::new(b"X123\nsecond\n".to_vec()));
        assert_eq!(p.obtain_secret().unwrap(), "X123\n");
    }

    #[test]
    fn eof_is_an_error() {
        let mut p = StdinPrompt::from_reader(Cursor::new(Vec::new()));
        assert!(p.obtain_secret().is_err());
    }
}
