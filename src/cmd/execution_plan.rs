use strum::Display;
use thiserror::Error;

use crate::parse::{token::Token, ArgVector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("missing file name after `{0}`")]
    MissingRedirectTarget(&'static str),
    #[error("missing command on the {0} side of `|`")]
    EmptyPipeSegment(Side),
    #[error("background pipelines are not supported")]
    BackgroundPipeline,
    #[error("empty command")]
    EmptyCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Truncate,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputTarget<'a> {
    pub path: &'a str,
    pub mode: OutputMode,
}

/// One program invocation: its arguments with every redirection removed,
/// and the redirections that applied to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment<'a> {
    pub argv: Vec<&'a str>,
    pub input: Option<&'a str>,
    pub output: Option<OutputTarget<'a>>,
}

impl<'a> Segment<'a> {
    /// The program name. Segments inside a plan are never empty.
    pub fn program(&self) -> &'a str {
        self.argv[0]
    }

    fn scan(tokens: &[Token<'a>]) -> Result<Self, PlanError> {
        let mut segment = Segment::default();
        let mut tokens = tokens.iter();

        while let Some(token) = tokens.next() {
            match token {
                Token::Read => {
                    segment.input = Some(redirect_target(&mut tokens, "<")?);
                }
                Token::Write => {
                    segment.output = Some(OutputTarget {
                        path: redirect_target(&mut tokens, ">")?,
                        mode: OutputMode::Truncate,
                    });
                }
                Token::Append => {
                    segment.output = Some(OutputTarget {
                        path: redirect_target(&mut tokens, ">>")?,
                        mode: OutputMode::Append,
                    });
                }
                // any pipe reaching this point is past the split and is a plain argument
                other => segment.argv.push(other.as_str()),
            }
        }

        Ok(segment)
    }

    /// Removes a trailing `&`, returning whether there was one.
    fn take_background(&mut self) -> bool {
        if self.argv.last() == Some(&Token::Background.as_str()) {
            self.argv.pop();
            true
        } else {
            false
        }
    }
}

fn redirect_target<'a>(
    tokens: &mut std::slice::Iter<'_, Token<'a>>,
    operator: &'static str,
) -> Result<&'a str, PlanError> {
    match tokens.next() {
        Some(Token::Word(path)) => Ok(*path),
        _ => Err(PlanError::MissingRedirectTarget(operator)),
    }
}

/// What a command line asks for once its operators have been interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan<'a> {
    pub left: Segment<'a>,
    pub right: Option<Segment<'a>>,
    pub background: bool,
}

impl<'a> ExecutionPlan<'a> {
    /// Builds a plan from a tokenized line in a single left-to-right pass.
    ///
    /// Only the first `|` splits the line; redirections apply to the side they
    /// were written on and the last one of each kind wins. A trailing `&` is
    /// checked for once everything else has been consumed. Returns `Ok(None)`
    /// for a blank line.
    pub fn scan(args: &ArgVector<'a>) -> Result<Option<Self>, PlanError> {
        let tokens = args.tokens();
        if tokens.is_empty() {
            return Ok(None);
        }

        let split = tokens.iter().position(|token| *token == Token::Pipe);

        let plan = match split {
            None => {
                let mut left = Segment::scan(tokens)?;
                let background = left.take_background();
                if left.argv.is_empty() {
                    return Err(PlanError::EmptyCommand);
                }
                ExecutionPlan {
                    left,
                    right: None,
                    background,
                }
            }
            Some(split) => {
                let left = Segment::scan(&tokens[..split])?;
                if left.argv.is_empty() {
                    return Err(PlanError::EmptyPipeSegment(Side::Left));
                }
                let mut right = Segment::scan(&tokens[split + 1..])?;
                if right.take_background() {
                    return Err(PlanError::BackgroundPipeline);
                }
                if right.argv.is_empty() {
                    return Err(PlanError::EmptyPipeSegment(Side::Right));
                }
                ExecutionPlan {
                    left,
                    right: Some(right),
                    background: false,
                }
            }
        };

        Ok(Some(plan))
    }

    pub fn is_pipeline(&self) -> bool {
        self.right.is_some()
    }
}
