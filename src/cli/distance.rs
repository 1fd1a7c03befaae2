use clap::Args;

use chopnow::geo::{Coordinate, distance_km, round_km};

#[derive(Debug, Args)]
pub(crate) struct DistanceArgs {
    /// Start point as "lat,lng"
    #[arg(allow_hyphen_values = true)]
    from: Coordinate,

    /// End point as "lat,lng"
    #[arg(allow_hyphen_values = true)]
    to: Coordinate,
}

pub(crate) fn run(args: &DistanceArgs) -> Result<(), String> {
    let km = distance_km(args.from, args.to);
    let rounded = round_km(km).ok_or_else(|| format!("distance {km} km cannot be displayed"))?;

    println!("{rounded} km");

    Ok(())
}
