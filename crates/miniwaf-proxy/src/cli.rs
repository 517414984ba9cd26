//! Command-line interface

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "miniwaf-proxy")]
#[command(about = "MiniWAF request-inspection proxy", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "miniwaf.yaml", env = "MINIWAF_CONFIG")]
    pub config: PathBuf,

    /// Rule file, overrides `rules_path` from the config file
    #[arg(short, long, env = "MINIWAF_RULES")]
    pub rules: Option<PathBuf>,

    /// Upstream application URL; without one the built-in demo app is served
    #[arg(short, long)]
    pub upstream: Option<String>,

    /// Listen address, overrides `listen` from the config file
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
