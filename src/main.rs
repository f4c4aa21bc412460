use clap::Parser;

use visionx::cli::{self, Args, Command, ConfigAction};
use visionx::config::Config;

/// Load a .env file from the working directory, if any.
///
/// Does not override existing environment variables, so an exported
/// `VISIONX_FACE_URL` wins over the file.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() {
    load_env();

    let args = Args::parse();
    init_logging(args.verbose);

    let config_path = args.config.clone();
    let mut config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        // A broken file must not block writing a fresh one elsewhere
        Err(e)
            if matches!(
                args.command,
                Command::Config {
                    action: ConfigAction::Init
                }
            ) =>
        {
            log::warn!("{}", e);
            Config::default()
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    config.apply_env_overrides();
    log::debug!(
        "Face service: {}, object service: {}",
        config.face.base_url,
        config.object.base_url
    );

    if let Err(e) = cli::run(args.command, &config, config_path.as_deref()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
