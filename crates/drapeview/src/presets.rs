use anyhow::Result;
use fxconfig::{Preset, ViewerConfig};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PresetSummary<'a> {
    name: &'a str,
    active: bool,
    builtin: bool,
    #[serde(flatten)]
    preset: &'a Preset,
}

pub fn list(config: &ViewerConfig, json: bool) -> Result<()> {
    let names = config.preset_names();
    let mut presets = Vec::with_capacity(names.len());
    for name in &names {
        presets.push((name.as_str(), config.resolve_preset(name)?));
    }

    if json {
        let summaries: Vec<_> = presets
            .iter()
            .map(|(name, preset)| summary(config, name, preset))
            .collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("Transition presets:");
    for (name, preset) in &presets {
        let marker = if *name == config.preset { "*" } else { " " };
        let passes = preset
            .layout()
            .kinds()
            .iter()
            .map(|kind| kind.id())
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{marker} {name:<12} out={:<7} in={:<7} curve={:<12} passes={passes}",
            format!("{}ms", preset.out_duration.as_millis()),
            format!("{}ms", preset.in_duration.as_millis()),
            preset.curve.to_string(),
        );
    }
    Ok(())
}

pub fn show(config: &ViewerConfig, name: &str) -> Result<()> {
    let preset = config.resolve_preset(name)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary(config, name, &preset))?
    );
    Ok(())
}

fn summary<'a>(config: &ViewerConfig, name: &'a str, preset: &'a Preset) -> PresetSummary<'a> {
    PresetSummary {
        name,
        active: name == config.preset,
        builtin: !config.presets.contains_key(name) && fxconfig::presets::builtin(name).is_some(),
        preset,
    }
}
