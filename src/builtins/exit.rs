use std::io::Write;

use crate::prelude::*;

use super::{BuiltinCommand, BuiltinError};

#[derive(Default)]
pub struct Exit;

impl BuiltinCommand for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn execute(
        &self,
        _args: &[&str],
        _state: &mut State,
        _out: &mut dyn Write,
    ) -> Result<Flow, BuiltinError> {
        Ok(Flow::Terminate)
    }
}
