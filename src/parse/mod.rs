use logos::Logos;
use thiserror::Error;

use self::token::{LexerError, Token};

pub mod token;

/// Capacity of an argument vector, counting the end-of-arguments slot.
pub const MAX_ARGS: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("failed to tokenize command: {0}")]
    Lexer(LexerError),
    #[error("too many arguments (at most {max})")]
    TooManyArguments { max: usize },
}

/// The tokens of one command line, in the order they were typed.
///
/// The vector ends where the tokens end; there is no explicit terminator
/// to keep in sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgVector<'a> {
    tokens: Vec<Token<'a>>,
}

impl<'a> ArgVector<'a> {
    pub fn tokens(&self) -> &[Token<'a>] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

/// Splits `line` into an [`ArgVector`].
///
/// `max_args` includes the end-of-arguments slot, so at most `max_args - 1`
/// tokens are accepted. Longer lines fail rather than being cut short, since
/// a truncated line could silently lose a redirection target or a trailing `&`.
pub fn tokenize(line: &str, max_args: usize) -> Result<ArgVector<'_>, ParseError> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let max = max_args.saturating_sub(1);

    let mut tokens = Vec::new();
    for token in Token::lexer(line) {
        let token = token.map_err(ParseError::Lexer)?;
        if tokens.len() == max {
            return Err(ParseError::TooManyArguments { max });
        }
        tokens.push(token);
    }

    trace!(count = tokens.len(), "tokenized command line");

    Ok(ArgVector { tokens })
}
