use std::io;

use chopnow::{config::ChopnowConfig, summary::QuoteSummary};

pub(crate) async fn run(config: &ChopnowConfig) -> Result<(), String> {
    let pricing = super::pricing_policy(config)?;
    let session = super::open_session(config, &pricing)?;
    let checkout = super::checkout_service(config, pricing);

    let quote = checkout
        .quote(session.state())
        .await
        .map_err(|error| error.user_message())?;

    QuoteSummary::new(session.cart(), &quote)
        .write_to(io::stdout().lock())
        .map_err(|error| format!("failed to print quote: {error}"))
}
