use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use pixeleditor::cli::{self, CliArgs};

fn main() -> ExitCode {
    // -- CLI / headless mode ---------------------------------------------
    if CliArgs::is_cli_mode() {
        let args = CliArgs::parse();
        return cli::run(args);
    }

    // The editing engine has no window of its own; without batch flags
    // print usage and leave.
    let mut cmd = CliArgs::command();
    let _ = cmd.print_help();
    println!();
    ExitCode::SUCCESS
}
