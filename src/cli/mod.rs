//! Command-line interface definitions.
//!
//! The command string is resolved exactly once, here, into the
//! [`Commands`] variants; everything past this boundary works with typed
//! requests.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::builder::RenderRequest;

/// Platen template-to-PDF press CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Root directory for resolving relative paths (default: current directory)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Config file path, relative to the root (default: platen.toml)
    #[arg(short = 'C', long, global = true, default_value = "platen.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render the document once
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        args: RenderArgs,
    },

    /// Render once, then rebuild whenever the template or data file changes
    #[command(visible_alias = "d")]
    Develop {
        #[command(flatten)]
        args: RenderArgs,
    },
}

/// Shared render arguments for Build and Develop commands
#[derive(clap::Args, Debug, Clone)]
pub struct RenderArgs {
    /// Template file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub template: PathBuf,

    /// Data file (yml, yaml or json)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub data: PathBuf,

    /// Output file (default: template path with a .pdf extension)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

impl RenderArgs {
    /// Fix the parameters of this invocation into an immutable request.
    pub fn to_request(&self) -> RenderRequest {
        let output = self.output.clone().unwrap_or_else(|| {
            let mut output = self.template.clone();
            output.set_extension("pdf");
            output
        });
        RenderRequest {
            data: self.data.clone(),
            template: self.template.clone(),
            output,
        }
    }
}
