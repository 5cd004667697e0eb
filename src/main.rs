use clap::Parser;
use cluster_report::{
    init_errors,
    init_logging,
    App,
};
use cluster_report_config::{
    Args,
    Config,
};
use color_eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let config = Config::new(Args::parse())?;
    init_logging(config.verbose, config.data_dir())?;
    App::new(config).run().await
}
