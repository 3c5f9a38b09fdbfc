mod args;
mod builtin;
mod cli;
mod history;
mod log;
mod process;
mod repl;
mod terminal;

use clap::Parser;

use crate::{
    cli::Cli,
    repl::{Shell, State},
    terminal::ReadLineError,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    log::init_tracing(cli.log_level);

    match run(&cli) {
        Err(err) if is_out_of_memory(&err) => {
            // nothing is cleaned up, the process is unusable at this point
            eprintln!("? Warning: Allocation error!");
            std::process::exit(1);
        }
        res => res,
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut shell = Shell::new(State::new(), std::io::stdout(), std::io::stderr(), cli.quiet);

    shell.startup(cli.rc())?;
    shell.repl(&mut std::io::stdin().lock())?;
    shell.shutdown();

    Ok(())
}

fn is_out_of_memory(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ReadLineError>(), Some(ReadLineError::Alloc(_)))
}

#[cfg(test)]
mod test_support {
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// Serializes tests touching the working directory, environment,
    /// signal dispositions, or child processes.
    static PROCESS: Mutex<()> = Mutex::new(());

    pub fn lock() -> MutexGuard<'static, ()> {
        PROCESS.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::collections::TryReserveError;

    fn alloc_failure() -> TryReserveError {
        Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err()
    }

    #[test]
    fn out_of_memory_is_detected() {
        let err = anyhow::Error::from(ReadLineError::Alloc(alloc_failure()));
        assert!(is_out_of_memory(&err));

        let err = anyhow::Error::from(ReadLineError::Io(std::io::ErrorKind::Other.into()));
        assert!(!is_out_of_memory(&err));

        let err = anyhow::anyhow!("something else");
        assert!(!is_out_of_memory(&err));
    }
}
