//! Order summary
//!
//! Renders a priced cart as a console table: one row per cart line, then the
//! cost breakdown.

use std::io;

use rusty_money::Money;
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    cart::{Cart, CartItem},
    checkout::CheckoutQuote,
    geo::round_km,
    menu::CustomizationChoice,
    pricing::TotalPriceError,
};

/// Errors that can occur when rendering a summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// An amount could not be rounded into money.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),

    /// Writing the summary failed.
    #[error("failed to write summary: {0}")]
    Io(#[from] io::Error),
}

/// A cart together with its quote, ready to print.
#[derive(Debug, Clone, Copy)]
pub struct QuoteSummary<'a> {
    cart: &'a Cart,
    quote: &'a CheckoutQuote,
}

impl<'a> QuoteSummary<'a> {
    /// Pair a cart with the quote computed for it.
    pub fn new(cart: &'a Cart, quote: &'a CheckoutQuote) -> Self {
        Self { cart, quote }
    }

    /// Write the summary tables to `out`.
    ///
    /// # Errors
    ///
    /// Returns a [`SummaryError`] if an amount cannot be formatted or writing fails.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), SummaryError> {
        if let Some(restaurant) = &self.quote.restaurant {
            writeln!(out, "\n{}", restaurant.name)?;
        }

        write_items(&mut out, self.cart)?;

        writeln!(out, "\n{}", self.totals_table()?)?;

        Ok(())
    }

    fn totals_table(&self) -> Result<String, SummaryError> {
        let mut builder = Builder::default();

        let distance = match self.quote.distance_km.and_then(round_km) {
            Some(km) => format!("{km} km"),
            None => "unknown".to_string(),
        };

        builder.push_record(["Distance".to_string(), distance]);

        for (label, amount) in self.quote.totals.lines()? {
            builder.push_record([label.to_string(), amount.to_string()]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Rows::last(), Color::BOLD);
        table.modify(Columns::last(), Alignment::right());

        Ok(table.to_string())
    }
}

/// The cart on its own, without fees.
#[derive(Debug, Clone, Copy)]
pub struct CartSummary<'a> {
    cart: &'a Cart,
}

impl<'a> CartSummary<'a> {
    /// Summarise `cart`.
    pub fn new(cart: &'a Cart) -> Self {
        Self { cart }
    }

    /// Write the cart table and subtotal to `out`.
    ///
    /// # Errors
    ///
    /// Returns a [`SummaryError`] if the subtotal cannot be computed or writing fails.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), SummaryError> {
        if let Some(restaurant) = self.cart.restaurant() {
            writeln!(out, "\n{}", restaurant.name)?;
        }

        write_items(&mut out, self.cart)?;

        if !self.cart.is_empty() {
            writeln!(out, "\nSubtotal: {}", self.cart.subtotal()?)?;
        }

        Ok(())
    }
}

fn write_items(out: &mut impl io::Write, cart: &Cart) -> Result<(), SummaryError> {
    if cart.is_empty() {
        writeln!(out, "\nYour cart is empty.")?;
        return Ok(());
    }

    let mut builder = Builder::default();

    builder.push_record(["", "Item", "Qty", "Unit", "Total"]);

    for item in cart.iter() {
        builder.push_record([
            short_id(item.id()).to_string(),
            item_label(item),
            item.quantity().to_string(),
            Money::from_minor(item.unit_price(), cart.currency()).to_string(),
            Money::from_minor(item.total_price(), cart.currency()).to_string(),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..5), Alignment::right());

    writeln!(out, "\n{table}")?;

    Ok(())
}

/// Leading block of a cart line id, enough to pick a line from the CLI.
fn short_id(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}

fn item_label(item: &CartItem) -> String {
    let mut options: Vec<&str> = item
        .customizations()
        .values()
        .flat_map(CustomizationChoice::options)
        .map(|option| option.name.as_str())
        .collect();

    if options.is_empty() {
        return item.menu_item().name.clone();
    }

    options.sort_unstable();

    format!("{}\n  {}", item.menu_item().name, options.join(", "))
}
