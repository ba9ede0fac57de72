mod cli;
mod paths;
mod presets;
mod run;

use anyhow::Result;
use cli::{Command, PresetsAction};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Presets(presets_cmd)) => {
            let config = run::load_config(cli.run.config.as_deref())?.config;
            match presets_cmd.action {
                PresetsAction::List { json } => presets::list(&config, json),
                PresetsAction::Show { name } => presets::show(&config, &name),
            }
        }
        None => run::run(cli.run),
    }
}
