use std::io;

use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;

use chopnow::{
    api::ApiClient,
    cart::{CartConflictPolicy, CartItem, RestaurantRef},
    config::ChopnowConfig,
    menu::{Customization, CustomizationChoice, Customizations, MenuItemRef},
    pricing::decimal_to_money,
    restaurants::RestaurantDirectory,
    session::{FileSessionStorage, Session},
    summary::CartSummary,
};

#[derive(Debug, Args)]
pub(crate) struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Show the cart
    Show,

    /// Add a menu item
    Add(AddArgs),

    /// Change the quantity of a cart line
    Quantity(QuantityArgs),

    /// Remove a cart line
    Remove(RemoveArgs),

    /// Empty the cart
    Clear,
}

#[derive(Debug, Args)]
struct AddArgs {
    /// Restaurant slug
    #[arg(long)]
    restaurant: String,

    /// Menu item id
    #[arg(long)]
    item_id: i64,

    /// Menu item name
    #[arg(long)]
    name: String,

    /// Unit price before customizations, e.g. 11.75
    #[arg(long)]
    price: Decimal,

    /// Quantity
    #[arg(long, default_value_t = 1)]
    quantity: u32,

    /// Customization; repeat a group to select several options in it
    #[arg(long = "option", value_name = "GROUP=NAME[:PRICE]")]
    options: Vec<String>,

    /// Empty the cart first if it holds another restaurant's items
    #[arg(long)]
    replace: bool,
}

#[derive(Debug, Args)]
struct QuantityArgs {
    /// Cart line id, or its first block as shown by `cart show`
    line: String,

    /// New quantity
    quantity: u32,
}

#[derive(Debug, Args)]
struct RemoveArgs {
    /// Cart line id, or its first block as shown by `cart show`
    line: String,
}

pub(crate) async fn run(config: &ChopnowConfig, command: CartCommand) -> Result<(), String> {
    let pricing = super::pricing_policy(config)?;
    let mut session = super::open_session(config, &pricing)?;

    match command.command {
        CartSubcommand::Show => {}
        CartSubcommand::Add(args) => add(config, &mut session, args).await?,
        CartSubcommand::Quantity(args) => {
            let id = resolve_line(&session, &args.line)?;

            session
                .update(|state| Ok(state.cart.update_quantity(&id, args.quantity)?))
                .map_err(|error| format!("failed to update quantity: {error}"))?;
        }
        CartSubcommand::Remove(args) => {
            let id = resolve_line(&session, &args.line)?;

            session
                .update(|state| Ok(state.cart.remove_item(&id)?))
                .map_err(|error| format!("failed to remove item: {error}"))?;
        }
        CartSubcommand::Clear => {
            session
                .clear_cart()
                .map_err(|error| format!("failed to clear cart: {error}"))?;
        }
    }

    CartSummary::new(session.cart())
        .write_to(io::stdout().lock())
        .map_err(|error| format!("failed to print cart: {error}"))
}

async fn add(
    config: &ChopnowConfig,
    session: &mut Session<FileSessionStorage>,
    args: AddArgs,
) -> Result<(), String> {
    let currency = session.cart().currency();

    let restaurant = ApiClient::new(config.api.client_config())
        .restaurant_by_slug(&args.restaurant)
        .await
        .map_err(|error| format!("failed to fetch restaurant: {error}"))?;

    let menu_item = MenuItemRef {
        id: args.item_id,
        name: args.name,
        price: minor_units(args.price, currency)?,
    };

    let item = CartItem::new(
        menu_item,
        args.quantity,
        parse_options(&args.options, currency)?,
        RestaurantRef::from(&restaurant),
    )
    .map_err(|error| format!("invalid cart item: {error}"))?;

    let policy = if args.replace {
        CartConflictPolicy::Replace
    } else {
        CartConflictPolicy::Reject
    };

    session
        .add_to_cart(item, policy)
        .map_err(|error| format!("failed to add item: {error}"))
}

/// Find the full id of the cart line matching `line` exactly or by prefix.
fn resolve_line(session: &Session<FileSessionStorage>, line: &str) -> Result<String, String> {
    let mut matches = session
        .cart()
        .iter()
        .map(CartItem::id)
        .filter(|id| id.starts_with(line));

    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id.to_string()),
        (Some(_), Some(_)) => Err(format!("cart line '{line}' is ambiguous")),
        (None, _) => Err(format!("no cart line matches '{line}'")),
    }
}

fn minor_units(amount: Decimal, currency: &'static Currency) -> Result<i64, String> {
    decimal_to_money(amount, currency)
        .map(|money| money.to_minor_units())
        .map_err(|error| format!("invalid price {amount}: {error}"))
}

/// Parse `GROUP=NAME[:PRICE]` options, grouping repeats of a group into one multi-choice.
fn parse_options(options: &[String], currency: &'static Currency) -> Result<Customizations, String> {
    let mut groups: FxHashMap<String, Vec<Customization>> = FxHashMap::default();

    for option in options {
        let (group, choice) = option
            .split_once('=')
            .ok_or_else(|| format!("option '{option}' should look like GROUP=NAME[:PRICE]"))?;

        let (name, price) = match choice.split_once(':') {
            Some((name, price)) => {
                let price = price
                    .trim()
                    .parse::<Decimal>()
                    .map_err(|error| format!("option '{option}' has an invalid price: {error}"))?;

                (name, minor_units(price, currency)?)
            }
            None => (choice, 0),
        };

        groups
            .entry(group.trim().to_string())
            .or_default()
            .push(Customization::new(name.trim(), price));
    }

    Ok(groups
        .into_iter()
        .map(|(group, mut choices)| {
            let choice = match choices.pop() {
                Some(only) if choices.is_empty() => CustomizationChoice::Single(only),
                Some(last) => {
                    choices.push(last);
                    CustomizationChoice::Multiple(choices)
                }
                None => CustomizationChoice::Multiple(choices),
            };

            (group, choice)
        })
        .collect())
}
