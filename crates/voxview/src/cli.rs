use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::GeometrySetting;

#[derive(Parser, Debug)]
#[command(
    name = "voxview",
    author,
    version,
    about = "Orbit viewer for voxel volumes",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Configuration file; defaults to `voxview.toml` in the config directory.
    #[arg(long, value_name = "FILE", env = "VOXVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Window size in physical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Scale applied to the offscreen target relative to the window.
    #[arg(long, value_name = "SCALE")]
    pub render_scale: Option<f32>,

    /// Geometry drawn by the main pass.
    #[arg(long, value_enum, value_name = "KIND")]
    pub geometry: Option<GeometrySetting>,

    /// Signed camera distance from the focus point along the view direction.
    #[arg(long, value_name = "DISTANCE", allow_negative_numbers = true)]
    pub offset: Option<f32>,

    /// Edge length of the generated cubic volume, in voxels.
    #[arg(long, value_name = "VOXELS")]
    pub volume_size: Option<u32>,

    #[command(flatten)]
    pub shaders: ShaderArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ShaderArgs {
    /// GLSL vertex shader for the main pass.
    #[arg(long, value_name = "FILE")]
    pub main_vertex: Option<PathBuf>,

    /// GLSL fragment shader for the main pass.
    #[arg(long, value_name = "FILE")]
    pub main_fragment: Option<PathBuf>,

    /// GLSL vertex shader for the post pass.
    #[arg(long, value_name = "FILE")]
    pub post_vertex: Option<PathBuf>,

    /// GLSL fragment shader for the post pass.
    #[arg(long, value_name = "FILE")]
    pub post_fragment: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile all four shader stages without opening a window.
    Check(RunArgs),
    /// Inspect the configuration.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration as TOML.
    Show(RunArgs),
    /// Print the default configuration file path.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(spec: &str) -> anyhow::Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1280x720"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("window dimensions must be greater than zero");
    }

    Ok((width, height))
}
