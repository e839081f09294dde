use teguchi::app::run;
use teguchi::config::Config;
use teguchi::error::Result;
use teguchi::logging::init;

#[tokio::main]
async fn main() -> Result<()> {
    init();

    let config = Config::from_env()?;

    run(config).await
}
