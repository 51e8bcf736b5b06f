//! msgpgen CLI: MessagePack codec generation for a package graph.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "msgpgen",
    version,
    about = "Generate MessagePack codecs for the types of a Go package graph"
)]
struct Cli {
    #[command(subcommand)]
    command: msgpgen::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = msgpgen::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
