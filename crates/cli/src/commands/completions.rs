//! completions command - Print a shell completion script

use std::io::Write;

use clap::CommandFactory;
use clap_complete::Shell;

use super::Cli;
use crate::exit_code::ExitCode;

/// Print a shell completion script
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn execute(args: CompletionsArgs) -> ExitCode {
    let mut stdout = std::io::stdout().lock();
    write_script(args.shell, &mut stdout);
    match stdout.flush() {
        Ok(()) => ExitCode::Success,
        Err(_) => ExitCode::GeneralError,
    }
}

fn write_script(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, out);
}
