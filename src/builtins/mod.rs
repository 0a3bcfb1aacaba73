use std::io::{self, Write};

use enum_dispatch::enum_dispatch;
use strum::{EnumIter, IntoEnumIterator};
use thiserror::Error;

use crate::prelude::*;

pub mod cd;
pub mod exit;
pub mod help;

#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("expected argument to \"{0}\"")]
    MissingArgument(&'static str),
    #[error("{path}: {source}")]
    ChangeDirectory {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("`{0}` cannot run in a pipeline or in the background")]
    Unsupported(&'static str),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// An operation run inside the shell process itself.
///
/// `args` is the whole argument vector, so `args[0]` is the built-in's own name.
#[enum_dispatch(BuiltinCommands)]
pub trait BuiltinCommand {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        args: &[&str],
        state: &mut State,
        out: &mut dyn Write,
    ) -> Result<Flow, BuiltinError>;
}

/// The built-in table, in lookup and listing order.
#[enum_dispatch]
#[derive(EnumIter)]
pub enum BuiltinCommands {
    Cd(cd::Cd),
    Exit(exit::Exit),
    Help(help::Help),
}

impl BuiltinCommands {
    pub fn from_name(name: &str) -> Option<Self> {
        Self::iter().find(|cmd| cmd.name() == name)
    }
}
