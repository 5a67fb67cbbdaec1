// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use clap::Parser;

use vision_decode::cli::args::{Cli, Commands};
use vision_decode::cli::predict::{run_detect, run_pose};
use vision_decode::error;

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Detect(args) => run_detect(args),
        Commands::Pose(args) => run_pose(args),
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}
