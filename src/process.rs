use std::ffi::CString;

use nix::{
    errno::Errno,
    sys::{
        signal::{signal, SigHandler, Signal},
        wait::wait,
    },
    unistd::{execvp, fork, ForkResult, Pid},
};
use tracing::{debug, trace};

use crate::{args::ArgVector, builtin::Errors};

/// Exit status of a child that could not replace its program image.
const EXEC_FAILURE: i32 = 1;

/// Runs everything the dispatcher does not recognise as a builtin.
pub trait ProcessRunner {
    /// Blocks until the command has finished. Failures of the command itself
    /// are not errors.
    fn run_process(&mut self, args: &ArgVector<'_>) -> Result<(), Errors>;
}

/// Duplicates the shell and replaces the copy with the requested program,
/// found through `PATH` and inheriting the environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForkExec;

impl ProcessRunner for ForkExec {
    fn run_process(&mut self, args: &ArgVector<'_>) -> Result<(), Errors> {
        let Some(program) = args.command() else {
            return Ok(());
        };

        // everything the child needs is prepared before the fork
        let argv = args
            .iter()
            .map(|a| CString::new(*a).map_err(|_| Errors::NulByte(a.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        let not_found = format!("? Program not found: {}\n", program);

        // the shell must survive an interrupt aimed at the child
        let previous =
            unsafe { signal(Signal::SIGINT, SigHandler::SigIgn) }.map_err(Errors::Signal)?;

        let res = match unsafe { fork() } {
            Err(err) => Err(Errors::Fork(err)),
            Ok(ForkResult::Child) => exec_child(&argv, &not_found),
            Ok(ForkResult::Parent { child }) => {
                debug!(%child, program, args = ?args.rest(), argc = args.len(), "spawned");
                wait_for(child)
            }
        };

        let restored = unsafe { signal(Signal::SIGINT, previous) };
        restored.map_err(Errors::Signal)?;
        res
    }
}

/// Never returns: either the program image is replaced or the child exits.
fn exec_child(argv: &[CString], not_found: &str) -> ! {
    unsafe {
        let _ = signal(Signal::SIGINT, SigHandler::SigDfl);
    }

    if let Some(program) = argv.first() {
        let _ = execvp(program, argv);
    }

    let _ = nix::unistd::write(std::io::stderr(), not_found.as_bytes());
    // skips the parent's exit handlers and buffered output
    unsafe { libc::_exit(EXEC_FAILURE) }
}

/// Reaps children until `child` is among them.
fn wait_for(child: Pid) -> Result<(), Errors> {
    loop {
        match wait() {
            Ok(status) if status.pid() == Some(child) => {
                debug!(%child, ?status, "reaped");
                return Ok(());
            }
            Ok(status) => trace!(?status, "reaped unrelated child"),
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                debug!(%child, "no children left to wait for");
                return Ok(());
            }
            Err(err) => return Err(Errors::Wait(err)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::{
        fs,
        io::{Read, Seek},
        os::fd::AsRawFd,
    };

    use pretty_assertions::{assert_eq, assert_str_eq};

    use crate::{args::split_line, terminal::read_line, test_support};

    fn run(txt: &str) -> Result<(), Errors> {
        let input = format!("{txt}\n");
        let line = read_line(&mut input.as_bytes()).unwrap();
        let args = split_line(&line).unwrap();
        ForkExec.run_process(&args)
    }

    #[test]
    fn runs_to_completion() {
        let _guard = test_support::lock();
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");

        run(&format!("touch {}", marker.display())).unwrap();
        // the child has been reaped by the time we get back
        assert!(marker.exists());
    }

    #[test]
    fn failing_program_is_not_an_error() {
        let _guard = test_support::lock();
        run("false").unwrap();
    }

    #[test]
    fn missing_program_is_not_an_error() {
        let _guard = test_support::lock();
        run("rcshell-definitely-not-a-program").unwrap();
    }

    #[test]
    fn nothing_to_run() {
        run("").unwrap();
    }

    #[test]
    fn nul_byte_is_rejected() {
        let _guard = test_support::lock();
        let res = run("echo a\0b");
        assert!(matches!(res, Err(Errors::NulByte(ref a)) if a == "a\0b"));
    }

    #[test]
    fn interrupt_disposition_restored() {
        let _guard = test_support::lock();
        let before = unsafe { signal(Signal::SIGINT, SigHandler::SigDfl) }.unwrap();

        run("true").unwrap();

        let after = unsafe { signal(Signal::SIGINT, before) }.unwrap();
        assert!(matches!(after, SigHandler::SigDfl));
    }

    #[test]
    fn child_interrupt_default_parent_survives() {
        let _guard = test_support::lock();
        let dir = tempfile::tempdir().unwrap();
        let status = dir.path().join("status");
        let script = dir.path().join("interrupt.sh");
        fs::write(
            &script,
            format!(
                "grep SigIgn /proc/self/status > {}\nkill -INT $PPID\n",
                status.display()
            ),
        )
        .unwrap();

        run(&format!("sh {}", script.display())).unwrap();

        // still here, so the interrupt sent while waiting was ignored
        let line = fs::read_to_string(&status).unwrap();
        let mask = line.trim().trim_start_matches("SigIgn:").trim();
        let mask = u64::from_str_radix(mask, 16).unwrap();
        assert_eq!(0, mask & (1 << (Signal::SIGINT as u64 - 1)), "{line}");
    }

    #[test]
    fn missing_program_reports_not_found() {
        let _guard = test_support::lock();
        let mut captured = tempfile::tempfile().unwrap();

        let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
        assert!(saved >= 0);
        unsafe { libc::dup2(captured.as_raw_fd(), libc::STDERR_FILENO) };
        let res = run("rcshell-definitely-not-a-program");
        unsafe {
            libc::dup2(saved, libc::STDERR_FILENO);
            libc::close(saved);
        }
        res.unwrap();

        let mut out = String::new();
        captured.rewind().unwrap();
        captured.read_to_string(&mut out).unwrap();
        assert_str_eq!("? Program not found: rcshell-definitely-not-a-program\n", out);
    }
}
