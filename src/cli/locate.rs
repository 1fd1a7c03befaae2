use clap::Args;
use tracing::warn;

use chopnow::{
    config::ChopnowConfig,
    geolocation::{NominatimGeocoder, ReverseGeocoder, capture_location},
};

#[derive(Debug, Args)]
pub(crate) struct LocateArgs {
    /// Also look up the street address for the position
    #[arg(long)]
    address: bool,
}

pub(crate) async fn run(config: &ChopnowConfig, args: &LocateArgs) -> Result<(), String> {
    let pricing = super::pricing_policy(config)?;
    let mut session = super::open_session(config, &pricing)?;

    let captured = capture_location(
        &mut session,
        &config.geolocation.geolocator(),
        config.geolocation.timeout(),
    )
    .await
    .map_err(|error| format!("failed to store location: {error}"))?;

    let Some(position) = captured else {
        match session.state().last_location {
            Some(previous) => println!("location unavailable, keeping {previous}"),
            None => println!("location unavailable, the flat delivery fee applies"),
        }

        return Ok(());
    };

    println!("location: {position}");

    if args.address {
        let geocoder = NominatimGeocoder::new(config.geolocation.nominatim());

        match geocoder.reverse_geocode(position).await {
            Ok(address) => println!("address: {address}"),
            Err(error) => {
                warn!("reverse geocoding failed: {error}");
                println!("address unavailable");
            }
        }
    }

    Ok(())
}
