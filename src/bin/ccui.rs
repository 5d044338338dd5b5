use anyhow::Result;
use ccui::api::logging::init_logging;
use ccui::cli::{self, Args};
use ccui::config::Config;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = Args::parse();
    let mut config = Config::load()?;
    args.apply_overrides(&mut config);
    config.validate()?;

    cli::run(args, config).await
}
