use clap::Args;

use chopnow::{
    config::ChopnowConfig,
    geo::{Coordinate, distance_km},
    pricing::decimal_to_money,
};

#[derive(Debug, Args)]
pub(crate) struct FeeArgs {
    /// Delivery distance in kilometres; omit for the flat fee
    #[arg(long, conflicts_with_all = ["from", "to"])]
    distance_km: Option<f64>,

    /// Customer position as "lat,lng"
    #[arg(long, requires = "to", allow_hyphen_values = true)]
    from: Option<Coordinate>,

    /// Restaurant position as "lat,lng"
    #[arg(long, requires = "from", allow_hyphen_values = true)]
    to: Option<Coordinate>,
}

impl FeeArgs {
    fn distance(&self) -> Option<f64> {
        match (self.distance_km, self.from, self.to) {
            (Some(km), _, _) => Some(km),
            (None, Some(from), Some(to)) => Some(distance_km(from, to)),
            _ => None,
        }
    }
}

pub(crate) fn run(config: &ChopnowConfig, args: &FeeArgs) -> Result<(), String> {
    let pricing = super::pricing_policy(config)?;

    let fee = pricing
        .delivery
        .fee(args.distance())
        .map_err(|error| format!("failed to calculate delivery fee: {error}"))?;

    let fee = decimal_to_money(fee, pricing.currency)
        .map_err(|error| format!("failed to format delivery fee: {error}"))?;

    println!("{fee}");

    Ok(())
}
