#[tokio::main]
async fn main() -> ollamacord::error::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("ollamacord=info,serenity=warn"),
    )
    .init();

    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        log::debug!("A rustls crypto provider was already installed");
    }

    log::info!("Starting ollamacord Discord bot");

    match ollamacord::run().await {
        Ok(()) => {
            log::info!("Bot shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Bot encountered an error: {e}");
            Err(e)
        }
    }
}
