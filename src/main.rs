use clap::Parser;
use pollsync::cli::{self, Cli, Command};
use pollsync::config;
use pollsync::logging;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    match args.command {
        Command::Replay { file, config: path } => {
            let cfg = config::load_config_or_default(path.as_deref())?;
            logging::init_logging(&cfg.logging)?;
            cli::handle_replay(&file, &cfg)
        }
        Command::Schema => cli::handle_schema(),
        Command::Version => {
            cli::handle_version();
            Ok(())
        }
    }
}
