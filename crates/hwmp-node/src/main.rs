use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use hwmp_node::{MeshNode, NodeConfig};

#[derive(Parser)]
#[command(name = "hwmp-node", about = "Check and describe an HWMP mesh point configuration")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/hwmp/node.toml")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json");

    let config = match NodeConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = hwmp_node::logging::init_with_level(&config.logging.level, json) {
        if json {
            hwmp_node::logging::init_json();
        } else {
            hwmp_node::logging::init();
        }
        tracing::warn!("{e}, using default log level");
    }

    match MeshNode::from_config(&config) {
        Ok(node) => {
            tracing::info!(summary = %node.summary(), "configuration valid");
            println!("{}", node.summary());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("invalid node configuration: {e}");
            ExitCode::FAILURE
        }
    }
}
