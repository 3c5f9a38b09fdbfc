use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

/// Command line of the shell.
#[derive(Parser, Debug)]
#[command(name = "rcshell", version, about = "A small interactive command interpreter", long_about = None)]
pub struct Cli {
    /// Configuration file replayed at startup, created when missing.
    #[arg(long, env = "RCSHELL_RC", default_value = ".shellrc")]
    pub rc: PathBuf,

    /// Do not replay the configuration file.
    #[arg(long)]
    pub no_rc: bool,

    /// Do not clear the screen or print the banner.
    #[arg(short, long)]
    pub quiet: bool,

    /// Default log filter, `RUST_LOG` takes precedence.
    #[arg(long, default_value = "warn")]
    pub log_level: LevelFilter,
}

impl Cli {
    pub fn rc(&self) -> Option<&std::path::Path> {
        (!self.no_rc).then_some(self.rc.as_path())
    }
}
