use clap::Parser;
use codegraph::cli::args::Cli;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    codegraph::logging::init(cli.quiet);
    codegraph::cli::run(cli).await
}
