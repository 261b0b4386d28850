use clap::Parser;
use std::path::PathBuf;

use crate::catalog::{ItemId, SubItemId};
use crate::render::{DEFAULT_GAMMA_REFERENCE_INTENSITY, DEFAULT_LIGHT_INTENSITY};

/// Headless product configurator.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "configurator",
    about = "Headless product configurator",
    long_about = "Loads a product catalog, switches between products and prints the \
        resulting configurator state.\n\n\
        EXAMPLES:\n\
          # Samba dancer, then the IKEA chair with its second texture\n\
          configurator --select 0 --select 7 --swap 7:1\n\
        \n\
          # Two selections back to back with slow loads; only the last one is shown\n\
          configurator --latency-ms 200 --select 2 --select 5",
    version
)]
pub struct Args {
    /// JSON catalog to use instead of the bundled products.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Directory holding the model files. Without it placeholder geometry
    /// is generated.
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Simulated load time for placeholder geometry.
    #[arg(long, default_value = "0")]
    pub latency_ms: u64,

    /// Product id to select. Repeat to issue several selections back to back.
    #[arg(long = "select")]
    pub select: Vec<u32>,

    /// Activate a sub-item, as `<item>:<sub-item>`.
    #[arg(long = "swap", value_parser = parse_swap)]
    pub swap: Vec<(ItemId, SubItemId)>,

    /// Frames to run after all selections have settled.
    #[arg(long, default_value = "60")]
    pub frames: u32,

    /// Key light intensity in linear output.
    #[arg(long, default_value_t = DEFAULT_LIGHT_INTENSITY)]
    pub light_intensity: f32,

    /// Key light intensity that looks the same with gamma output on.
    #[arg(long, default_value_t = DEFAULT_GAMMA_REFERENCE_INTENSITY)]
    pub gamma_reference: f32,

    /// Viewport width in pixels.
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Viewport height in pixels.
    #[arg(long, default_value = "720")]
    pub height: u32,

    /// Write the active catalog as JSON and continue.
    #[arg(long)]
    pub dump_catalog: Option<PathBuf>,
}

fn parse_swap(value: &str) -> Result<(ItemId, SubItemId), String> {
    let (item, sub_item) = value
        .split_once(':')
        .ok_or_else(|| format!("expected <item>:<sub-item>, got '{}'", value))?;
    let item = item
        .trim()
        .parse()
        .map_err(|_| format!("invalid item id '{}'", item))?;
    let sub_item = sub_item
        .trim()
        .parse()
        .map_err(|_| format!("invalid sub-item id '{}'", sub_item))?;
    Ok((ItemId(item), SubItemId(sub_item)))
}
