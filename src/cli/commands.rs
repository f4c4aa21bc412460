//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use super::args::{Command, ConfigAction};
use crate::analysis::{AnalysisResult, PipelineKind};
use crate::camera::{self, CaptureDevice, StillImageDevice, UnavailableDevice};
use crate::config::{default_path as get_config_path, Config};
use crate::pipeline::{Pipeline, PipelineError};
use crate::render::{describe, save_result_image, status_line};

/// Run a parsed subcommand against the loaded configuration.
pub async fn run(command: Command, config: &Config, config_path: Option<&Path>) -> Result<(), String> {
    match command {
        Command::Detect {
            kind,
            image,
            output,
        } => run_detect(config, kind, &image, output.as_deref()).await,
        Command::Live {
            kind,
            device,
            still,
            mirror,
            output,
        } => run_live(config, kind, device, still.as_deref(), mirror, output).await,
        Command::Enrich { kind, image } => run_enrich(config, kind, &image).await,
        Command::Health => {
            run_health(config).await;
            Ok(())
        }
        Command::ListCameras => list_cameras(),
        Command::Config { action } => handle_config_action(action, config, config_path),
    }
}

fn build_pipeline(
    config: &Config,
    kind: PipelineKind,
    device: Arc<dyn CaptureDevice>,
) -> Result<Pipeline, String> {
    let client = config.client_for(kind).map_err(|e| e.to_string())?;
    Ok(Pipeline::new(kind, device, client, config.pipeline_options()))
}

async fn read_image(path: &Path) -> Result<Vec<u8>, String> {
    tokio::fs::read(path)
        .await
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}

/// Print the pipeline's current result and optionally save its image.
fn report(pipeline: &Pipeline, output: Option<&Path>) {
    let snapshot = pipeline.snapshot();
    print!("{}", describe(&snapshot));
    if let Some(path) = output {
        if snapshot.has_success() {
            match save_result_image(&snapshot, path) {
                Ok(written) => println!("Saved result image: {}", written.display()),
                Err(e) => eprintln!("Error: {}", e),
            }
        }
    }
}

/// Map a delivered result to the process outcome. The failure text itself
/// has already been printed by [`report`].
fn ensure_success(result: &AnalysisResult) -> Result<(), String> {
    if result.is_success() {
        Ok(())
    } else {
        Err(format!("{} failed", result.mode().label()))
    }
}

async fn run_detect(
    config: &Config,
    kind: PipelineKind,
    image: &Path,
    output: Option<&Path>,
) -> Result<(), String> {
    let bytes = read_image(image).await?;
    let pipeline = build_pipeline(config, kind, Arc::new(UnavailableDevice))?;

    log::info!("Submitting {} to {}", image.display(), kind.label());
    let result = pipeline.upload(&bytes).await.map_err(|e| e.to_string())?;
    report(&pipeline, output);
    ensure_success(&result)
}

async fn run_enrich(config: &Config, kind: PipelineKind, image: &Path) -> Result<(), String> {
    let bytes = read_image(image).await?;
    let pipeline = build_pipeline(config, kind, Arc::new(UnavailableDevice))?;

    let detection = pipeline.upload(&bytes).await.map_err(|e| e.to_string())?;
    if !detection.is_success() {
        report(&pipeline, None);
        return ensure_success(&detection);
    }

    let narrative = pipeline.enrich().await.map_err(|e| e.to_string())?;
    report(&pipeline, None);
    ensure_success(&narrative)
}

async fn probe_service(config: &Config, kind: PipelineKind) -> String {
    match config.client_for(kind) {
        Ok(client) => {
            let status = client.probe_health().await;
            format!("{}: {} - {}", kind.label(), client.base_url(), status)
        }
        Err(e) => format!("{}: invalid configuration ({})", kind.label(), e),
    }
}

async fn run_health(config: &Config) {
    let (face, object) = tokio::join!(
        probe_service(config, PipelineKind::Face),
        probe_service(config, PipelineKind::Object)
    );
    println!("{}", face);
    println!("{}", object);
}

/// One line of input to the `live` command loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveCommand {
    Capture,
    AnalyzeLive,
    Enrich,
    Stop,
    Restart,
    Print,
    Help,
    Quit,
}

impl LiveCommand {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "c" | "capture" => Some(LiveCommand::Capture),
            "a" | "ai" => Some(LiveCommand::AnalyzeLive),
            "e" | "enrich" => Some(LiveCommand::Enrich),
            "s" | "stop" => Some(LiveCommand::Stop),
            "r" | "restart" | "start" => Some(LiveCommand::Restart),
            "p" | "print" => Some(LiveCommand::Print),
            "h" | "?" | "help" => Some(LiveCommand::Help),
            "q" | "quit" | "exit" => Some(LiveCommand::Quit),
            _ => None,
        }
    }
}

fn print_live_help() {
    println!("Commands:");
    println!("  c  capture and detect");
    println!("  a  AI analysis of the live frame");
    println!("  e  AI analysis of the current result");
    println!("  s  stop camera");
    println!("  r  restart camera");
    println!("  p  print current result");
    println!("  q  quit (or Ctrl-C)");
}

async fn run_live(
    config: &Config,
    kind: PipelineKind,
    device_index: Option<u32>,
    still: Option<&Path>,
    mirror: bool,
    output: Option<PathBuf>,
) -> Result<(), String> {
    let device: Arc<dyn CaptureDevice> = match still {
        Some(path) => Arc::new(StillImageDevice::from_path(path).map_err(|e| e.to_string())?),
        None => camera::default_device(),
    };

    let mut options = config.pipeline_options();
    if let Some(index) = device_index {
        options.camera.device_index = index;
    }
    options.camera.mirror |= mirror;

    let client = config.client_for(kind).map_err(|e| e.to_string())?;
    let pipeline = Arc::new(Pipeline::new(kind, device, client, options));

    pipeline.start().await.map_err(|e| e.to_string())?;
    println!("{}", status_line(kind, pipeline.state()));
    print_live_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        pipeline.stop();
                        return Err(format!("Failed to read input: {}", e));
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(command) = LiveCommand::parse(&line) else {
                    println!("Unknown command '{}'. Type 'h' for help.", line.trim());
                    continue;
                };
                match command {
                    LiveCommand::Quit => break,
                    LiveCommand::Help => print_live_help(),
                    LiveCommand::Print => {
                        println!("{}", status_line(kind, pipeline.state()));
                        print!("{}", describe(&pipeline.snapshot()));
                    }
                    LiveCommand::Stop => {
                        pipeline.stop();
                        println!("{}", status_line(kind, pipeline.state()));
                    }
                    LiveCommand::Restart => match pipeline.start().await {
                        Ok(()) => println!("{}", status_line(kind, pipeline.state())),
                        Err(e) => eprintln!("Error: {}", e),
                    },
                    LiveCommand::Capture | LiveCommand::AnalyzeLive | LiveCommand::Enrich => {
                        spawn_analysis(Arc::clone(&pipeline), command, output.clone());
                    }
                }
            }
        }
    }

    pipeline.stop();
    Ok(())
}

/// Run an analysis in the background so the input loop stays responsive
/// (a stop issued mid-request must be honoured).
fn spawn_analysis(pipeline: Arc<Pipeline>, command: LiveCommand, output: Option<PathBuf>) {
    tokio::spawn(async move {
        let outcome: Result<AnalysisResult, PipelineError> = match command {
            LiveCommand::Capture => pipeline.capture().await,
            LiveCommand::AnalyzeLive => pipeline.analyze_live().await,
            _ => pipeline.enrich().await,
        };
        match outcome {
            Ok(_) => {
                println!("{}", status_line(pipeline.kind(), pipeline.state()));
                report(&pipeline, output.as_deref());
            }
            Err(e) if e.is_silent() => log::debug!("Ignored: {}", e),
            Err(e) => eprintln!("Error: {}", e),
        }
    });
}

/// List available cameras and print them to stdout.
pub fn list_cameras() -> Result<(), String> {
    let devices = camera::list_devices().map_err(|e| e.to_string())?;
    if devices.is_empty() {
        println!("No cameras found.");
        println!();
        if cfg!(feature = "native-camera") {
            println!("Make sure your camera is connected and permissions are granted.");
        } else {
            println!("This build has no camera backend; rebuild with --features native-camera.");
        }
    } else {
        println!("Available cameras:");
        for device in devices {
            println!("  {}", device);
        }
        println!();
        println!("Use --device <index> to select a camera.");
    }
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    action: ConfigAction,
    config: &Config,
    config_path: Option<&Path>,
) -> Result<(), String> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    match action {
        ConfigAction::Show => {
            println!("Current configuration:");
            println!();
            print!("{}", config.to_toml().map_err(|e| e.to_string())?);
            println!();
            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found)", path.display());
            }
            Ok(())
        }
        ConfigAction::Init => {
            let written = init_config_file(&path)?;
            println!("Created config file: {}", written.display());
            Ok(())
        }
    }
}

/// Write the default configuration to `path`, refusing to overwrite.
pub fn init_config_file(path: &Path) -> Result<PathBuf, String> {
    if path.exists() {
        return Err(format!(
            "Config file already exists: {}\nUse 'visionx config show' to view current settings.",
            path.display()
        ));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Error creating config directory: {}", e))?;
    }

    let body = Config::default().to_toml().map_err(|e| e.to_string())?;
    let content = format!("# visionx configuration\n\n{}", body);
    std::fs::write(path, content).map_err(|e| format!("Error writing config file: {}", e))?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_command_parse() {
        assert_eq!(LiveCommand::parse("c"), Some(LiveCommand::Capture));
        assert_eq!(LiveCommand::parse(" a \n"), Some(LiveCommand::AnalyzeLive));
        assert_eq!(LiveCommand::parse("enrich"), Some(LiveCommand::Enrich));
        assert_eq!(LiveCommand::parse("s"), Some(LiveCommand::Stop));
        assert_eq!(LiveCommand::parse("q"), Some(LiveCommand::Quit));
        assert_eq!(LiveCommand::parse("x"), None);
    }

    #[test]
    fn test_init_config_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init_config_file(&path).unwrap();
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_init_config_file_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[camera]\ndevice = 3\n").unwrap();

        let err = init_config_file(&path).unwrap_err();
        assert!(err.contains("already exists"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[camera]\ndevice = 3\n"
        );
    }
}
