use std::{
    fs::OpenOptions,
    io::{BufReader, Read, Write},
    path::Path,
};

use anyhow::Context;
use tracing::{debug, trace, warn};

use crate::{
    args::{split_line, ArgVector},
    builtin::{self, Status},
    history::History,
    process::{ForkExec, ProcessRunner},
    terminal::{self, read_line, ReadLineError, END_OF_INPUT},
};

pub struct State {
    pub history: History,
    runner: Box<dyn ProcessRunner>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    pub fn new() -> Self {
        Self::with_runner(Box::new(ForkExec))
    }

    pub fn with_runner(runner: Box<dyn ProcessRunner>) -> Self {
        Self {
            history: History::new(),
            runner,
        }
    }

    /// Runs one tokenized line.
    ///
    /// Builtins always win over programs of the same name. Only `exit` and
    /// the end of input stop the session, every reported error continues it.
    pub fn execute(
        &mut self,
        args: &ArgVector<'_>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> std::io::Result<Status> {
        trace!(args = ?args.as_slice(), "dispatching");
        let Some(command) = args.command() else {
            return Ok(Status::Continue);
        };

        if command == END_OF_INPUT {
            trace!("end of input");
            return Ok(Status::Exit);
        }

        let res = match builtin::lookup(command) {
            Some(b) => {
                debug!(command, "running builtin");
                (b.run)(self, args, stdout)
            }
            None => {
                debug!(command, "running program");
                // pending output has to land before the child's
                stdout.flush()?;
                self.runner.run_process(args).map(|()| Status::Continue)
            }
        };

        match res {
            Ok(status) => Ok(status),
            Err(err) => {
                debug!(command, %err, "command failed");
                writeln!(stderr, "? {}", err)?;
                Ok(Status::Continue)
            }
        }
    }
}

/// An interactive session writing to `stdout` and `stderr`.
pub struct Shell<W, E> {
    pub state: State,
    stdout: W,
    stderr: E,
    quiet: bool,
}

impl<W: Write, E: Write> Shell<W, E> {
    pub fn new(state: State, stdout: W, stderr: E, quiet: bool) -> Self {
        Self {
            state,
            stdout,
            stderr,
            quiet,
        }
    }

    /// Greets the user and replays the configuration file, if any.
    pub fn startup(&mut self, rc: Option<&Path>) -> anyhow::Result<()> {
        if !self.quiet {
            terminal::print_banner(&mut self.stdout).context("Unable to print the banner")?;
        }

        if let Some(rc) = rc {
            self.load_config(rc)?;
        }

        self.state.history = History::new();
        Ok(())
    }

    /// Runs every line of `path` like a typed one, without recording it.
    ///
    /// Replay ends at the first empty line or at the end of the file. The file
    /// is created when missing.
    pub fn load_config(&mut self, path: &Path) -> anyhow::Result<()> {
        if !self.quiet {
            writeln!(self.stdout, "READING CONFIG...")?;
        }

        let file = match OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
        {
            Ok(file) => file,
            Err(err) => {
                warn!(path = %path.display(), %err, "unable to open configuration");
                writeln!(self.stderr, "? Unable to open {}: {}", path.display(), err)?;
                return Ok(());
            }
        };

        let mut reader = BufReader::new(file);
        loop {
            let line = read_line(&mut reader)?;
            if line.is_empty() || line.is_end_of_input() {
                break;
            }

            if !self.quiet {
                writeln!(self.stdout, "\t{}", line)?;
            }

            let args = split_line(&line).map_err(ReadLineError::from)?;
            let status = self
                .state
                .execute(&args, &mut self.stdout, &mut self.stderr)?;

            if status == Status::Exit {
                warn!(%line, "configuration line asked to stop");
                writeln!(self.stdout, "\tUnable to run command: {}!", line)?;
            }
        }

        if !self.quiet {
            writeln!(self.stdout)?;
        }
        Ok(())
    }

    /// Prompts, records, and runs lines from `input` until told to stop.
    pub fn repl<R: Read>(&mut self, input: &mut R) -> anyhow::Result<()> {
        loop {
            terminal::prompt(&mut self.stdout)?;

            let line = read_line(input)?;

            if line.is_end_of_input() {
                // leave the terminal on a fresh line
                writeln!(self.stdout)?;
            } else if let Err(err) = self.state.history.save(&line) {
                debug!(%err, "unable to record line");
                writeln!(self.stderr, "? Allocation error!")?;
            }

            let args = split_line(&line).map_err(ReadLineError::from)?;
            let status = self
                .state
                .execute(&args, &mut self.stdout, &mut self.stderr)?;

            if status == Status::Exit {
                break;
            }
        }

        self.stdout.flush()?;
        Ok(())
    }

    pub fn shutdown(&mut self) {
        debug!(entries = self.state.history.len(), "shutting down");
        self.state.history.release();
    }
}
