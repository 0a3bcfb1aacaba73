use std::io;

use thiserror::Error;

use crate::{
    builtins::BuiltinError,
    parse::ParseError,
    process::{LaunchError, WaitError},
};

use self::execution_plan::PlanError;

pub mod execute;
pub mod execution_plan;

/// Whether the read/execute loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Terminate,
}

/// Anything that stops a single command line. None of these end the shell.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Builtin(#[from] BuiltinError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error("{path}: {source}")]
    Redirect {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}
