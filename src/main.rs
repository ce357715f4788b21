//! gbatile - command-line tool for packaging GBA tile assets as C source

use std::process::ExitCode;

use gbatile::cli;

fn main() -> ExitCode {
    env_logger::init();
    cli::run()
}
