use minikv::{Environment, StartUpFacade};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = Environment::init()?;

    // RUST_LOG, when set, takes precedence over --log_level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(env.log_level).into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    StartUpFacade::new(&env).await?.run().await
}
