//! Checkout form validation.

use std::fmt;

use smallvec::SmallVec;
use thiserror::Error;

use crate::{checkout::models::CheckoutForm, session::SessionState};

/// A required checkout field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutField {
    /// Customer name
    Name,

    /// Contact phone number
    Phone,

    /// Delivery address
    Address,

    /// Email from the customer's profile
    CustomerEmail,
}

impl fmt::Display for CheckoutField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::CustomerEmail => "email",
        };

        f.write_str(label)
    }
}

/// Every required field that was missing, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("missing required fields: {}", join(&self.missing))]
pub struct ValidationErrors {
    missing: SmallVec<[CheckoutField; 4]>,
}

impl ValidationErrors {
    /// Missing fields
    pub fn fields(&self) -> &[CheckoutField] {
        &self.missing
    }

    /// Whether `field` was missing
    pub fn contains(&self, field: CheckoutField) -> bool {
        self.missing.contains(&field)
    }

    fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }

    fn push(&mut self, field: CheckoutField) {
        self.missing.push(field);
    }
}

/// Comma-separated field labels.
pub(crate) fn join(fields: &[CheckoutField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Checkout form after validation, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedForm {
    /// Customer name
    pub name: String,

    /// Contact phone number
    pub phone: String,

    /// Delivery address
    pub address: String,

    /// Rider notes, `None` when blank
    pub instructions: Option<String>,

    /// Email from the customer's profile
    pub customer_email: String,
}

/// Check the form and profile for required fields.
///
/// All missing fields are reported together.
///
/// # Errors
///
/// Returns [`ValidationErrors`] listing every required field that is blank.
pub fn validate(form: &CheckoutForm, state: &SessionState) -> Result<ValidatedForm, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = required(&form.name, CheckoutField::Name, &mut errors);
    let phone = required(&form.phone, CheckoutField::Phone, &mut errors);
    let address = required(&form.address, CheckoutField::Address, &mut errors);
    let customer_email = required(
        state.customer_email.as_deref().unwrap_or_default(),
        CheckoutField::CustomerEmail,
        &mut errors,
    );

    if !errors.is_empty() {
        return Err(errors);
    }

    let instructions = form
        .instructions
        .as_deref()
        .map(str::trim)
        .filter(|notes| !notes.is_empty())
        .map(str::to_string);

    Ok(ValidatedForm {
        name,
        phone,
        address,
        instructions,
        customer_email,
    })
}

fn required(value: &str, field: CheckoutField, errors: &mut ValidationErrors) -> String {
    let value = value.trim();

    if value.is_empty() {
        errors.push(field);
    }

    value.to_string()
}
