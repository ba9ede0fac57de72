use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "drapeview",
    author,
    version,
    about = "Garment viewer with shader-driven model-swap transitions",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; defaults to `drapeview.toml` in the config directory.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Transition preset (`still`, `pixel`, `glitch`, `blinds`, `diffuse` or one from the config).
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Catalog model shown at startup.
    #[arg(long, value_name = "ID")]
    pub model: Option<String>,

    /// Catalog matcap texture applied at startup.
    #[arg(long, value_name = "ID")]
    pub texture: Option<String>,

    /// Logical window size (e.g. `1280x800`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Directory relative asset paths resolve against. Defaults to the
    /// directory holding the configuration file.
    #[arg(long, value_name = "DIR")]
    pub asset_root: Option<PathBuf>,

    /// Never download assets; only `file://` and local paths are loaded.
    #[arg(long)]
    pub offline: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the transition presets available to the viewer.
    Presets(PresetsCommand),
}

#[derive(Parser, Debug)]
pub struct PresetsCommand {
    #[command(subcommand)]
    pub action: PresetsAction,
}

#[derive(Subcommand, Debug)]
pub enum PresetsAction {
    /// List built-in and configured presets.
    List {
        /// Emit machine-readable JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print one preset as JSON.
    Show {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x800".to_string())?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{width}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{height}'"))?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1280x800"), Ok((1280, 800)));
        assert_eq!(parse_size(" 640 X 480 "), Ok((640, 480)));
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x800").is_err());
        assert!(parse_size("widexhigh").is_err());
    }

    #[test]
    fn config_flag_is_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["drapeview", "presets", "list", "--config", "a.toml"])
            .expect("parse cli");
        assert_eq!(cli.run.config, Some(PathBuf::from("a.toml")));
        assert!(matches!(
            cli.command,
            Some(Command::Presets(PresetsCommand {
                action: PresetsAction::List { json: false }
            }))
        ));
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "drapeview",
            "--preset",
            "glitch",
            "--model",
            "tee",
            "--size",
            "800x600",
            "--offline",
        ])
        .expect("parse cli");
        assert!(cli.command.is_none());
        assert_eq!(cli.run.preset.as_deref(), Some("glitch"));
        assert_eq!(cli.run.model.as_deref(), Some("tee"));
        assert_eq!(cli.run.size, Some((800, 600)));
        assert!(cli.run.offline);
    }
}
