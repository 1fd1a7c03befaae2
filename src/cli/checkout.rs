use clap::Args;

use chopnow::{
    checkout::CheckoutForm,
    config::ChopnowConfig,
    orders::PaymentMethod,
};

#[derive(Debug, Args)]
pub(crate) struct CheckoutArgs {
    /// Customer name
    #[arg(long)]
    name: String,

    /// Contact phone number
    #[arg(long)]
    phone: String,

    /// Delivery address
    #[arg(long)]
    address: String,

    /// Notes for the rider
    #[arg(long)]
    instructions: Option<String>,

    /// Profile email, remembered for later orders
    #[arg(long, env = "CHOPNOW_CUSTOMER_EMAIL")]
    email: Option<String>,

    /// Payment method
    #[arg(long, value_enum, default_value_t = PaymentMethod::Cash)]
    payment: PaymentMethod,
}

pub(crate) async fn run(config: &ChopnowConfig, args: CheckoutArgs) -> Result<(), String> {
    let pricing = super::pricing_policy(config)?;
    let mut session = super::open_session(config, &pricing)?;

    if let Some(email) = args.email {
        session
            .set_customer_email(email)
            .map_err(|error| format!("failed to store email: {error}"))?;
    }

    let mut checkout = super::checkout_service(config, pricing);

    let form = CheckoutForm {
        name: args.name,
        phone: args.phone,
        address: args.address,
        instructions: args.instructions,
    };

    let receipt = checkout
        .submit(&mut session, &form, args.payment)
        .await
        .map_err(|error| error.user_message())?;

    println!("order_id: {}", receipt.order_id);
    if let Some(status) = receipt.status {
        println!("status: {status}");
    }
    if let Some(payment_intent_id) = receipt.payment_intent_id {
        println!("payment_intent_id: {payment_intent_id}");
    }
    println!("total: {}", receipt.total);

    Ok(())
}
