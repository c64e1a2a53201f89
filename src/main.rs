use clap::error::ErrorKind;
use clap::Parser;
use git_credential_vault::cli::{self, Cli};
use std::process;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    if let Err(err) = cli.run() {
        tracing::error!("{:#}", err);
        process::exit(cli::exit_code(&err));
    }
}
