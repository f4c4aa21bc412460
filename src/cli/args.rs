//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::analysis::PipelineKind;

/// Capture frames and run them through face or object detection services
#[derive(Parser, Debug)]
#[command(name = "visionx")]
#[command(version, about = "Camera and image analysis against face/object detection services", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run detection on an image file
    Detect {
        /// Which service to use
        kind: PipelineKind,

        /// Image file (JPEG, PNG, ...)
        image: PathBuf,

        /// Write the annotated result image here
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Stream from a camera and analyze frames on command
    Live {
        /// Which service to use
        kind: PipelineKind,

        /// Camera device index (from list-cameras)
        #[arg(long)]
        device: Option<u32>,

        /// Serve this image as the camera feed instead of a real device
        #[arg(long)]
        still: Option<PathBuf>,

        /// Mirror camera horizontally
        #[arg(long)]
        mirror: bool,

        /// Write each annotated result image here
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Run detection on an image, then ask for an AI narrative of the result
    Enrich {
        /// Which service to use
        kind: PipelineKind,

        /// Image file
        image: PathBuf,
    },

    /// Check whether the face and object services are reachable
    Health,

    /// List available cameras
    ListCameras,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}
