use std::{
    fs::{File, OpenOptions},
    io::Write,
    os::unix::fs::OpenOptionsExt,
    path::Path,
};

use nix::sys::signal::Signal;

use super::{
    execution_plan::{ExecutionPlan, OutputMode, OutputTarget},
    CommandError,
};
use crate::{
    builtins::{BuiltinCommand, BuiltinCommands, BuiltinError},
    prelude::*,
    process::{self, signals, JobStatus},
};

impl ExecutionPlan<'_> {
    /// Runs the plan to completion: a built-in in this process, or a job of
    /// one or two children. Foreground jobs are waited on here; background
    /// jobs are handed to `state.jobs`.
    pub fn execute(&self, state: &mut State, out: &mut dyn Write) -> Result<Flow, CommandError> {
        if let Some(builtin) = BuiltinCommands::from_name(self.left.program()) {
            return self.execute_builtin(builtin, state, out);
        }

        if let Some(builtin) = self
            .right
            .as_ref()
            .and_then(|right| BuiltinCommands::from_name(right.program()))
        {
            return Err(BuiltinError::Unsupported(builtin.name()).into());
        }

        // anything buffered must reach the terminal before the children write
        out.flush()?;

        let job = process::launch(self, &state.working_dir)?;

        if job.is_background() {
            let pid = job.leader();
            state.jobs.track(job);
            info!(%pid, "started background job");
            writeln!(out, "Started background job with PID: {pid}")?;
            return Ok(Flow::Continue);
        }

        let status = job.wait()?;
        debug!(%status, "foreground job finished");

        if signals::take_interrupt() {
            debug!("interrupt arrived while a foreground job was running");
        }

        match status {
            JobStatus::Signaled(Signal::SIGINT) => writeln!(out)?,
            JobStatus::Signaled(_) => eprintln!("orbit: {status}"),
            JobStatus::Exited(_) => {}
        }

        state.last_status = Some(status);

        Ok(Flow::Continue)
    }

    fn execute_builtin(
        &self,
        builtin: BuiltinCommands,
        state: &mut State,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        // `exit` ends the loop whatever else the line asks for
        if let BuiltinCommands::Exit(exit) = &builtin {
            return Ok(exit.execute(&self.left.argv, state, out)?);
        }

        if self.is_pipeline() || self.background {
            return Err(BuiltinError::Unsupported(builtin.name()).into());
        }

        if let Some(input) = self.left.input {
            trace!(input, "built-ins do not read input, ignoring redirection");
        }

        let args = &self.left.argv;

        let flow = match self.left.output {
            Some(target) => {
                let mut file = open_output(&state.working_dir, target)?;
                builtin.execute(args, state, &mut file)?
            }
            None => builtin.execute(args, state, out)?,
        };

        Ok(flow)
    }
}

fn open_output(working_dir: &Path, target: OutputTarget<'_>) -> Result<File, CommandError> {
    let mut options = OpenOptions::new();
    options.create(true).mode(0o644);
    match target.mode {
        OutputMode::Truncate => options.write(true).truncate(true),
        OutputMode::Append => options.append(true),
    };

    options
        .open(working_dir.join(target.path))
        .map_err(|source| CommandError::Redirect {
            path: target.path.to_string(),
            source,
        })
}
