use clap::Parser;

use hubsnap_cli::cli_args::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = hubsnap_cli::run(cli).await {
        eprintln!("hubsnap failed: {err:#}");
        std::process::exit(1);
    }
}
