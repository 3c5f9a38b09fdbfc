use std::io::Write;

use crate::{args::ArgVector, repl::State};

/// Continuation signal handed back to the read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Continue,
    Exit,
}

#[derive(thiserror::Error, Debug)]
pub enum Errors {
    #[error("Must specify a variable name!")]
    MissingVariable,
    #[error("Could not open: {0}")]
    ChangeDir(String),
    #[error("Unable to set {0}!")]
    SetVar(String),
    #[error("Unable to unset {0}!")]
    UnsetVar(String),
    #[error("Fork system call failed! <{0}>")]
    Fork(nix::Error),
    #[error("Unable to change the interrupt disposition <{0}>")]
    Signal(nix::Error),
    #[error("Unable to wait for the child process <{0}>")]
    Wait(nix::Error),
    #[error("Argument contains a NUL byte: {0}")]
    NulByte(String),
    #[error("Io Error <{0}>")]
    IoError(#[from] std::io::Error),
}

pub type Behavior = fn(&mut State, &ArgVector<'_>, &mut dyn Write) -> Result<Status, Errors>;

pub struct Builtin {
    pub name: &'static str,
    pub description: &'static str,
    pub run: Behavior,
}

pub static BUILTINS: [Builtin; 7] = [
    Builtin {
        name: "help",
        description: " \t\t\tprints this list of builtin commands",
        run: help::run,
    },
    Builtin {
        name: "history",
        description: " \t\tprints out the list of previously used commands",
        run: history::run,
    },
    Builtin {
        name: "cd",
        description: " [dir] \t\tchanges working directory to dir or HOME if dir is omitted",
        run: cd::run,
    },
    Builtin {
        name: "setenv",
        description: " <var> [value] \tcreates environment variable var with value, unless var already exists",
        run: setenv::run,
    },
    Builtin {
        name: "unsetenv",
        description: " <var> \t\tdestroys an environment variable",
        run: unsetenv::run,
    },
    Builtin {
        name: "env",
        description: " \t\t\tprints list of the current environment variables",
        run: env::run,
    },
    Builtin {
        name: "exit",
        description: " \t\t\tterminates current session",
        run: exit::run,
    },
];

/// First entry whose name equals `name` exactly.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

mod help {
    use itertools::Itertools as _;

    use super::{ArgVector, Errors, State, Status, BUILTINS};

    pub fn run(
        _state: &mut State,
        _args: &ArgVector<'_>,
        stdout: &mut dyn std::io::Write,
    ) -> Result<Status, Errors> {
        let table = BUILTINS
            .iter()
            .format_with("\n", |b, f| f(&format_args!("\t{}{}", b.name, b.description)));

        writeln!(stdout, "\nBuilt in commands: \n{}\n", table)?;
        Ok(Status::Continue)
    }
}

mod history {
    use super::{ArgVector, Errors, State, Status};

    pub fn run(
        state: &mut State,
        _args: &ArgVector<'_>,
        stdout: &mut dyn std::io::Write,
    ) -> Result<Status, Errors> {
        state.history.print(stdout)?;
        Ok(Status::Continue)
    }
}

mod cd {
    use std::path::PathBuf;

    use tracing::debug;

    use super::{ArgVector, Errors, State, Status};

    /// Slot text shown when the failing path came from `HOME`.
    const MISSING_SLOT: &str = "(null)";

    pub fn run(
        _state: &mut State,
        args: &ArgVector<'_>,
        _stdout: &mut dyn std::io::Write,
    ) -> Result<Status, Errors> {
        let target = match args.get(1) {
            Some(dir) => Some(PathBuf::from(dir)),
            None => std::env::var_os("HOME").map(PathBuf::from),
        };

        let changed = match target {
            Some(target) => std::env::set_current_dir(&target).map_err(|err| {
                debug!(path = %target.display(), %err, "unable to change directory");
            }),
            None => {
                debug!("HOME is not set");
                Err(())
            }
        };

        // the message echoes the argument slot, even when it is empty
        changed
            .map(|()| Status::Continue)
            .map_err(|()| Errors::ChangeDir(args.get(1).unwrap_or(MISSING_SLOT).to_string()))
    }
}

/// Shared by `setenv` and `unsetenv`.
mod var_name {
    use std::sync::LazyLock;

    use regex::Regex;

    static VALID: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[^=\x00]+$").expect("valid variable name pattern"));

    pub fn is_valid(name: &str) -> bool {
        VALID.is_match(name)
    }
}

mod setenv {
    use tracing::debug;

    use super::{var_name, ArgVector, Errors, State, Status};

    pub fn run(
        _state: &mut State,
        args: &ArgVector<'_>,
        _stdout: &mut dyn std::io::Write,
    ) -> Result<Status, Errors> {
        let Some(name) = args.get(1) else {
            return Err(Errors::MissingVariable);
        };
        let value = args.get(2).unwrap_or_default();

        if !var_name::is_valid(name) || value.contains('\0') {
            return Err(Errors::SetVar(name.to_string()));
        }

        // an existing variable is never overwritten
        if std::env::var_os(name).is_some() {
            debug!(var = name, "variable already set, keeping it");
            return Ok(Status::Continue);
        }

        std::env::set_var(name, value);
        Ok(Status::Continue)
    }
}

mod unsetenv {
    use super::{var_name, ArgVector, Errors, State, Status};

    pub fn run(
        _state: &mut State,
        args: &ArgVector<'_>,
        _stdout: &mut dyn std::io::Write,
    ) -> Result<Status, Errors> {
        let Some(name) = args.get(1) else {
            return Err(Errors::MissingVariable);
        };

        if !var_name::is_valid(name) {
            return Err(Errors::UnsetVar(name.to_string()));
        }

        std::env::remove_var(name);
        Ok(Status::Continue)
    }
}

mod env {
    use super::{ArgVector, Errors, State, Status};

    pub fn run(
        _state: &mut State,
        _args: &ArgVector<'_>,
        stdout: &mut dyn std::io::Write,
    ) -> Result<Status, Errors> {
        for (k, v) in std::env::vars_os() {
            writeln!(stdout, "\t{}={}", k.to_string_lossy(), v.to_string_lossy())?;
        }
        Ok(Status::Continue)
    }
}

mod exit {
    use super::{ArgVector, Errors, State, Status};

    pub fn run(
        _state: &mut State,
        _args: &ArgVector<'_>,
        _stdout: &mut dyn std::io::Write,
    ) -> Result<Status, Errors> {
        Ok(Status::Exit)
    }
}
