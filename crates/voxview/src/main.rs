//! Entry point: parses the CLI, initialises tracing, and dispatches to the
//! viewer, the offline shader check, or the config helpers in `run.rs`.

mod cli;
mod config;
mod paths;
mod run;
mod scene;
mod shaders;
mod window;

use anyhow::Result;
use cli::{Command, ConfigAction};
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Check(args)) => run::check(args),
        Some(Command::Config(config_cmd)) => match config_cmd.action {
            ConfigAction::Show(args) => run::show_config(args),
            ConfigAction::Where => run_config_where(),
        },
        None => run::run(cli.run),
    }
}

fn run_config_where() -> Result<()> {
    let paths = AppPaths::discover()?;
    println!("{}", paths.config_file().display());
    Ok(())
}
