use std::io::Write;

use itertools::Itertools;
use once_cell::sync::Lazy;
use strum::IntoEnumIterator;

use crate::prelude::*;

use super::{BuiltinCommand, BuiltinCommands, BuiltinError};

static HELP_TEXT: Lazy<String> = Lazy::new(|| {
    let builtins = BuiltinCommands::iter()
        .map(|cmd| format!("  {}", cmd.name()))
        .join("\n");

    format!(
        "Orbit Shell\n\
         Type program names and arguments, and hit enter.\n\
         The following are built in:\n\
         {builtins}\n\
         Use the man command for information on other programs.\n\
         Supports piping ('|'), I/O redirection ('<', '>', '>>'), and background tasks ('&').\n"
    )
});

#[derive(Default)]
pub struct Help;

impl BuiltinCommand for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn execute(
        &self,
        _args: &[&str],
        _state: &mut State,
        out: &mut dyn Write,
    ) -> Result<Flow, BuiltinError> {
        out.write_all(HELP_TEXT.as_bytes())?;
        out.flush()?;

        Ok(Flow::Continue)
    }
}
