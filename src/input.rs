use std::io::{self, BufRead};

use thiserror::Error;

use crate::process::signals;

#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// An interrupt arrived while reading; the partial line was discarded.
    Interrupted,
    Eof,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("line exceeds the maximum length of {max} bytes")]
    LineTooLong { max: usize },
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
}

impl InputError {
    /// Whether the reader can keep going after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Reads command lines, one per call.
pub struct LineReader<R> {
    reader: R,
    max_len: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R, max_len: usize) -> Self {
        Self { reader, max_len }
    }

    /// Reads up to the next newline, which is stripped. A final line without a
    /// newline is still returned. An over-long line is consumed in full and
    /// then rejected, so the next call starts on the following line.
    pub fn read_line(&mut self) -> Result<ReadOutcome, InputError> {
        let mut line = Vec::new();
        let mut too_long = false;

        loop {
            let (consumed, done) = {
                let available = match self.reader.fill_buf() {
                    Ok(available) => available,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                        signals::take_interrupt();
                        return Ok(ReadOutcome::Interrupted);
                    }
                    Err(err) => return Err(err.into()),
                };

                if available.is_empty() {
                    if line.is_empty() && !too_long {
                        return Ok(ReadOutcome::Eof);
                    }
                    break;
                }

                let (chunk, consumed, done) = match available.iter().position(|&b| b == b'\n') {
                    Some(end) => (&available[..end], end + 1, true),
                    None => (available, available.len(), false),
                };

                if line.len() + chunk.len() > self.max_len {
                    too_long = true;
                } else if !too_long {
                    line.extend_from_slice(chunk);
                }

                (consumed, done)
            };

            self.reader.consume(consumed);
            if done {
                break;
            }
        }

        if too_long {
            return Err(InputError::LineTooLong { max: self.max_len });
        }

        String::from_utf8(line)
            .map(ReadOutcome::Line)
            .map_err(|_| InputError::InvalidUtf8)
    }
}
