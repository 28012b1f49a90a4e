//! Preset and configuration commands.

use crate::config::{self, Config};
use crate::convert::FfmpegConverter;

/// List encoding presets
pub fn cmd_presets(config: &Config) -> anyhow::Result<()> {
    for preset in &config.conversion.presets {
        let marker = if preset.title == config.conversion.preset {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<20} .{:<5} {}",
            marker,
            preset.title,
            preset.extension,
            preset.args.join(" ")
        );
    }

    let converter = FfmpegConverter::new(config.conversion.ffmpeg_path.clone(), Vec::new());
    println!();
    if converter.is_available() {
        println!("ffmpeg: found, other formats are converted with the preset marked *");
    } else {
        println!("ffmpeg: not found, only MP3 and AAC files can be copied");
    }
    Ok(())
}

/// Show the config file location and effective settings
pub fn cmd_config(config: &Config, init: bool) -> anyhow::Result<()> {
    if init {
        config::save(config)?;
    }

    match config::config_path() {
        Some(path) if path.exists() => println!("# {}", path.display()),
        Some(path) => println!("# {} (not present, showing defaults)", path.display()),
        None => println!("# no config directory, showing defaults"),
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
