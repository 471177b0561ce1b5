//! readme-lens CLI entry point.

use clap::Parser;
use readme_lens::cli::{self, Cli};

fn main() {
    let cli = Cli::parse();
    std::process::exit(cli::run(cli));
}
