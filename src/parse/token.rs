use logos::Logos;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Default, Error)]
pub enum LexerError {
    #[default]
    #[error("unknown token")]
    UnknownToken,
}

/// A whitespace-delimited word of a command line.
///
/// Operators are only recognised when they make up a whole word, so `a>b` lexes
/// as a single [`Token::Word`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Logos)]
#[logos(skip r"[ \t\r\n\x07]+", error = LexerError)]
pub enum Token<'a> {
    #[token("|")]
    Pipe,
    #[token("<")]
    Read,
    #[token(">")]
    Write,
    #[token(">>")]
    Append,
    #[token("&")]
    Background,

    #[regex(r"[^ \t\r\n\x07]+", |lex| lex.slice())]
    Word(&'a str),
}

impl<'a> Token<'a> {
    /// The literal text of the token, as typed.
    pub fn as_str(&self) -> &'a str {
        match self {
            Self::Pipe => "|",
            Self::Read => "<",
            Self::Write => ">",
            Self::Append => ">>",
            Self::Background => "&",
            Self::Word(word) => *word,
        }
    }
}
