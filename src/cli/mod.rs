#![expect(
    clippy::print_stdout,
    reason = "commands report their results on stdout"
)]

use std::sync::Arc;

use clap::{Parser, Subcommand};

use chopnow::{
    api::ApiClient,
    checkout::CheckoutService,
    config::ChopnowConfig,
    payments::CardPaymentsUnavailable,
    pricing::PricingPolicy,
    restaurants::RestaurantDirectory,
    session::{FileSessionStorage, Session},
};

mod cart;
mod checkout;
mod distance;
mod fee;
mod locate;
mod quote;

#[derive(Debug, Parser)]
#[command(name = "chopnow", about = "ChopNow delivery pricing and checkout", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) config: ChopnowConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Great-circle distance between two "lat,lng" points
    Distance(distance::DistanceArgs),

    /// Delivery fee for a distance
    Fee(fee::FeeArgs),

    /// Capture the customer's location into the session
    Locate(locate::LocateArgs),

    /// Inspect or change the cart
    Cart(cart::CartCommand),

    /// Price the cart, including delivery and platform fees
    Quote,

    /// Place an order for the cart
    Checkout(checkout::CheckoutArgs),
}

impl Cli {
    /// Load configuration from `.env`, the environment and CLI arguments.
    pub(crate) fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Distance(args) => distance::run(&args),
            Commands::Fee(args) => fee::run(&self.config, &args),
            Commands::Locate(args) => locate::run(&self.config, &args).await,
            Commands::Cart(command) => cart::run(&self.config, command).await,
            Commands::Quote => quote::run(&self.config).await,
            Commands::Checkout(args) => checkout::run(&self.config, args).await,
        }
    }
}

fn pricing_policy(config: &ChopnowConfig) -> Result<PricingPolicy, String> {
    config
        .pricing
        .policy()
        .map_err(|error| format!("invalid pricing configuration: {error}"))
}

fn open_session(
    config: &ChopnowConfig,
    pricing: &PricingPolicy,
) -> Result<Session<FileSessionStorage>, String> {
    Session::open(config.session.storage(), pricing.currency).map_err(|error| {
        format!(
            "failed to open session {}: {error}",
            config.session.session_file.display()
        )
    })
}

fn checkout_service(config: &ChopnowConfig, pricing: PricingPolicy) -> CheckoutService {
    let api = Arc::new(ApiClient::new(config.api.client_config()));
    let restaurants: Arc<dyn RestaurantDirectory> = api.clone();

    CheckoutService::new(
        restaurants,
        api,
        Arc::new(CardPaymentsUnavailable),
        pricing,
    )
}
