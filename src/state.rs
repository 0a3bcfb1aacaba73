use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use termion::{color, style};

use crate::{
    cmd::{execution_plan::ExecutionPlan, CommandError, Flow},
    config::Config,
    parse::tokenize,
    process::{BackgroundJobs, JobStatus},
};

/// Everything that outlives a single command line.
pub struct State {
    /// Initial directory of every child. Only `cd` changes it.
    pub working_dir: PathBuf,
    pub config: Config,
    pub jobs: BackgroundJobs,
    pub last_status: Option<JobStatus>,
    styled: bool,
}

impl State {
    pub fn new(config: Config) -> io::Result<Self> {
        let working_dir = std::env::current_dir()?;
        Ok(Self::with_working_dir(config, working_dir))
    }

    pub fn with_working_dir(config: Config, working_dir: PathBuf) -> Self {
        let styled = config.color && termion::is_tty(&io::stdout());

        Self {
            working_dir,
            config,
            jobs: BackgroundJobs::default(),
            last_status: None,
            styled,
        }
    }

    /// The prompt for the next line. If the working directory has gone away
    /// the error is reported and a prompt without it is used instead.
    pub fn prompt(&self) -> String {
        let symbol = &self.config.prompt_symbol;

        match fs::metadata(&self.working_dir) {
            Ok(meta) if meta.is_dir() => {
                let cwd = self.working_dir.display();
                if self.styled {
                    format!(
                        "{symbol} {}{}{cwd}{} > ",
                        style::Bold,
                        color::Fg(color::Cyan),
                        style::Reset
                    )
                } else {
                    format!("{symbol} {cwd} > ")
                }
            }
            res => {
                let reason = match res {
                    Err(err) => err.to_string(),
                    Ok(_) => "Not a directory".to_string(),
                };
                warn!(dir = ?self.working_dir, %reason, "working directory is unavailable");
                eprintln!("orbit: {}: {reason}", self.working_dir.display());
                format!("{symbol} > ")
            }
        }
    }

    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self.prompt())?;
        out.flush()
    }

    /// Reaps finished background jobs, announcing them if configured to.
    pub fn report_finished_jobs<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        for (pid, status) in self.jobs.reap() {
            info!(%pid, %status, "background job finished");
            if self.config.report_background_completion {
                writeln!(out, "[{pid}] Done ({status})")?;
            }
        }
        Ok(())
    }

    /// Runs one command line. Failures are reported on stderr and never end
    /// the loop; only `exit` does.
    pub fn execute(&mut self, line: &str, out: &mut dyn Write) -> Flow {
        match self.run(line, out) {
            Ok(flow) => flow,
            Err(err) => {
                error!(%err, line, "command failed");
                eprintln!("orbit: {err}");
                Flow::Continue
            }
        }
    }

    fn run(&mut self, line: &str, out: &mut dyn Write) -> Result<Flow, CommandError> {
        let args = tokenize(line, self.config.max_args)?;

        let Some(plan) = ExecutionPlan::scan(&args)? else {
            return Ok(Flow::Continue);
        };

        trace!(?plan, "execution plan");

        plan.execute(self, out)
    }
}
