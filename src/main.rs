use std::io::{self, Write};

use color_eyre::Result;
use tracing_subscriber::prelude::*;

use crate::{
    cmd::Flow,
    config::Config,
    input::{LineReader, ReadOutcome},
    state::State,
};

#[macro_use]
extern crate tracing;

pub mod builtins;
pub mod cmd;
pub mod config;
pub mod input;
pub mod parse;
pub mod prelude;
pub mod process;
pub mod state;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    let (writer, _guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        &config.log_dir,
        &config.log_file,
    ));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_error::ErrorLayer::default())
        .init();

    color_eyre::install()?;

    trace!(?config, "loaded config");

    process::signals::install()?;

    let mut state = State::new(config)?;
    let mut reader = LineReader::new(io::stdin().lock(), state.config.max_line_len);
    let mut stdout = io::stdout();

    loop {
        state.report_finished_jobs(&mut stdout)?;
        state.render(&mut stdout)?;

        match reader.read_line() {
            Ok(ReadOutcome::Line(line)) => {
                if state.execute(&line, &mut stdout) == Flow::Terminate {
                    debug!("exit requested");
                    break;
                }
            }
            Ok(ReadOutcome::Interrupted) => {
                trace!("interrupted while reading");
                writeln!(stdout)?;
            }
            Ok(ReadOutcome::Eof) => {
                writeln!(stdout, "exit")?;
                break;
            }
            Err(err) if err.is_recoverable() => {
                warn!(%err, "discarding input line");
                eprintln!("orbit: {err}");
            }
            Err(err) => return Err(err.into()),
        }
    }

    if !state.jobs.is_empty() {
        debug!(count = state.jobs.len(), "leaving background jobs running");
    }

    Ok(())
}
