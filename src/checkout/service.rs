//! Checkout service.
//!
//! Prices the session's cart and drives one checkout attempt at a time through
//! validation, optional card payment and order submission.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    checkout::{
        errors::CheckoutError,
        models::{CheckoutForm, CheckoutQuote, CheckoutReceipt, CheckoutState},
        validation::{ValidatedForm, validate},
    },
    geo::distance_km,
    orders::{OrderDetails, OrderGateway, OrderLine, OrderRequest, PaymentMethod},
    payments::{PaymentProvider, PaymentRequest},
    pricing::{PricingPolicy, minor_to_decimal, round_amount},
    restaurants::{Restaurant, RestaurantDirectory},
    session::{Session, SessionState, SessionStorage},
};

/// Idempotency key held across retries of an unchanged order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingAttempt {
    fingerprint: u64,
    key: Uuid,
}

/// The services an attempt talks to, plus the pricing it quotes with.
struct Backends {
    restaurants: Arc<dyn RestaurantDirectory>,
    orders: Arc<dyn OrderGateway>,
    payments: Arc<dyn PaymentProvider>,
    pricing: PricingPolicy,
}

/// Quotes and submits orders for a session.
pub struct CheckoutService {
    backends: Backends,
    state: CheckoutState,
    pending: Option<PendingAttempt>,
}

impl std::fmt::Debug for CheckoutService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutService")
            .field("pricing", &self.backends.pricing)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl CheckoutService {
    /// Create a checkout service over the given backends.
    #[must_use]
    pub fn new(
        restaurants: Arc<dyn RestaurantDirectory>,
        orders: Arc<dyn OrderGateway>,
        payments: Arc<dyn PaymentProvider>,
        pricing: PricingPolicy,
    ) -> Self {
        Self {
            backends: Backends {
                restaurants,
                orders,
                payments,
                pricing,
            },
            state: CheckoutState::Idle,
            pending: None,
        }
    }

    /// Current pipeline state.
    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// Pricing policy in use.
    pub fn pricing(&self) -> &PricingPolicy {
        &self.backends.pricing
    }

    /// Price the cart held in `state`.
    ///
    /// A failed restaurant lookup is logged and priced as if the restaurant had no
    /// coordinates, which falls back to the flat delivery fee.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] if the cart or fees cannot be priced.
    pub async fn quote(&self, state: &SessionState) -> Result<CheckoutQuote, CheckoutError> {
        self.backends.quote(state).await
    }

    /// Run one checkout attempt for the session's cart.
    ///
    /// Cash orders are submitted straight away. Card orders are submitted only after
    /// the payment provider confirms the charge. On success the cart is cleared; on any
    /// failure it is left as it was. The service is back in
    /// [`CheckoutState::Idle`] once the attempt ends, including when the returned
    /// future is dropped before completing.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] describing why no order was created.
    /// [`CheckoutError::PaidOrderFailed`] means the card was charged regardless.
    #[instrument(skip_all, fields(?method))]
    pub async fn submit<S: SessionStorage>(
        &mut self,
        session: &mut Session<S>,
        form: &CheckoutForm,
        method: PaymentMethod,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let mut attempt = Attempt::begin(&mut self.state)?;

        let validated = check(form, session.state())?;

        attempt.advance(CheckoutState::Submitting)?;

        let placed = self
            .backends
            .place_order(&mut self.pending, session.state(), validated, method)
            .await;

        let receipt = match placed {
            Ok(receipt) => receipt,
            Err(err) => {
                if err.requires_support() {
                    error!("{err}");
                } else {
                    warn!("checkout failed: {err}");
                }

                return Err(err);
            }
        };

        attempt.advance(CheckoutState::Submitted)?;

        info!(order_id = receipt.order_id, "order placed");

        // The key stays pending until the cart is gone, so resubmitting the same
        // cart replays this order rather than creating another.
        match session.clear_cart() {
            Ok(()) => self.pending = None,
            Err(err) => {
                warn!(order_id = receipt.order_id, "order placed but cart not cleared: {err}");
            }
        }

        Ok(receipt)
    }
}

impl Backends {
    #[instrument(skip_all)]
    async fn quote(&self, state: &SessionState) -> Result<CheckoutQuote, CheckoutError> {
        let subtotal = state.cart.subtotal()?;

        let restaurant = match state.cart.restaurant() {
            Some(cart_restaurant) => self.fetch_restaurant(&cart_restaurant.slug).await,
            None => None,
        };

        let distance_km = match (
            state.last_location,
            restaurant.as_ref().and_then(Restaurant::coordinate),
        ) {
            (Some(customer), Some(kitchen)) => Some(distance_km(customer, kitchen)),
            _ => None,
        };

        debug!(?distance_km, "pricing cart");

        let totals = self.pricing.totals(subtotal, distance_km)?;

        Ok(CheckoutQuote {
            restaurant,
            distance_km,
            totals,
        })
    }

    async fn fetch_restaurant(&self, slug: &str) -> Option<Restaurant> {
        match self.restaurants.restaurant_by_slug(slug).await {
            Ok(restaurant) => Some(restaurant),
            Err(err) => {
                warn!(slug, "could not fetch restaurant, using fallback delivery fee: {err}");
                None
            }
        }
    }

    async fn place_order(
        &self,
        pending: &mut Option<PendingAttempt>,
        state: &SessionState,
        form: ValidatedForm,
        method: PaymentMethod,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let quote = self.quote(state).await?;
        let total = quote.totals.grand_total_money()?;
        let details = order_details(state, form, method, &quote)?;
        let idempotency_key = idempotency_key(pending, details.fingerprint()?);

        let payment_intent_id = match method {
            PaymentMethod::Cash => None,
            PaymentMethod::Card => {
                let request = PaymentRequest {
                    amount: total.to_minor_units(),
                    currency: total.currency().iso_alpha_code,
                    customer_email: details.customer_email.clone(),
                    idempotency_key,
                };

                let confirmation = match self.payments.confirm_card_payment(&request).await {
                    Ok(confirmation) => confirmation,
                    Err(err) => {
                        // Nothing was charged, so the next attempt is a new payment.
                        *pending = None;
                        return Err(err.into());
                    }
                };

                debug!(payment_intent_id = %confirmation.payment_intent_id, "card payment confirmed");

                Some(confirmation.payment_intent_id)
            }
        };

        let request = OrderRequest {
            details,
            payment_intent_id,
            idempotency_key,
        };

        let confirmation = match self.orders.submit_order(&request).await {
            Ok(confirmation) => confirmation,
            Err(source) => {
                return Err(match request.payment_intent_id {
                    Some(payment_intent_id) => CheckoutError::PaidOrderFailed {
                        payment_intent_id,
                        source,
                    },
                    None => CheckoutError::OrderSubmission(source),
                });
            }
        };

        Ok(CheckoutReceipt {
            order_id: confirmation.id,
            status: confirmation.status,
            payment_intent_id: request.payment_intent_id,
            total,
        })
    }
}

/// One pass through the pipeline. Dropping it returns the state to `Idle`.
struct Attempt<'a> {
    state: &'a mut CheckoutState,
}

impl<'a> Attempt<'a> {
    fn begin(state: &'a mut CheckoutState) -> Result<Self, CheckoutError> {
        transition(state, CheckoutState::Validating)?;

        Ok(Self { state })
    }

    fn advance(&mut self, next: CheckoutState) -> Result<(), CheckoutError> {
        transition(self.state, next)
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if *self.state != CheckoutState::Idle {
            debug!(from = %self.state, "checkout attempt ended");
            *self.state = CheckoutState::Idle;
        }
    }
}

fn transition(state: &mut CheckoutState, next: CheckoutState) -> Result<(), CheckoutError> {
    if !state.can_transition_to(next) {
        return Err(CheckoutError::InvalidTransition {
            from: *state,
            to: next,
        });
    }

    *state = next;

    Ok(())
}

/// Reuse the pending key for an unchanged order, otherwise start a new one.
fn idempotency_key(pending: &mut Option<PendingAttempt>, fingerprint: u64) -> Uuid {
    match *pending {
        Some(attempt) if attempt.fingerprint == fingerprint => attempt.key,
        _ => {
            let key = Uuid::new_v4();
            *pending = Some(PendingAttempt { fingerprint, key });
            key
        }
    }
}

fn check(form: &CheckoutForm, state: &SessionState) -> Result<ValidatedForm, CheckoutError> {
    if state.cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    Ok(validate(form, state)?)
}

fn order_details(
    state: &SessionState,
    form: ValidatedForm,
    method: PaymentMethod,
    quote: &CheckoutQuote,
) -> Result<OrderDetails, CheckoutError> {
    let restaurant_id = state.cart.restaurant_id().ok_or(CheckoutError::EmptyCart)?;

    let items = state
        .cart
        .iter()
        .map(|item| OrderLine {
            menu_item_id: item.menu_item().id,
            name: item.menu_item().name.clone(),
            quantity: item.quantity(),
            customizations: item.customizations().clone(),
            total_price: minor_to_decimal(item.total_price()),
        })
        .collect();

    let totals = &quote.totals;

    Ok(OrderDetails {
        restaurant_id,
        customer_name: form.name,
        customer_phone: form.phone,
        customer_email: form.customer_email,
        delivery_address: form.address,
        delivery_instructions: form.instructions,
        payment_method: method,
        customer_latitude: state.last_location.map(|position| position.latitude),
        customer_longitude: state.last_location.map(|position| position.longitude),
        items,
        subtotal: round_amount(totals.subtotal()),
        platform_fee: round_amount(totals.platform_fee()),
        delivery_fee: round_amount(totals.delivery_fee()),
        total_amount: round_amount(totals.grand_total()),
    })
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex, OnceLock,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use mockall::Sequence;
    use rust_decimal::Decimal;
    use rusty_money::{Money, iso::GBP};
    use testresult::TestResult;

    use crate::{
        api::ApiError,
        cart::{CartConflictPolicy, CartItem, RestaurantRef},
        geo::Coordinate,
        menu::{Customizations, MenuItemRef},
        orders::{MockOrderGateway, OrderConfirmation},
        payments::{MockPaymentProvider, PaymentConfirmation, PaymentError},
        restaurants::MockRestaurantDirectory,
        session::{MemorySessionStorage, SessionError},
    };

    use super::*;

    const CUSTOMER: Coordinate = Coordinate::new(51.5074, -0.1278);

    fn restaurant() -> Restaurant {
        Restaurant {
            id: 7,
            name: "Noodle Bar".to_string(),
            slug: "noodle-bar".to_string(),
            latitude: Some(51.5155),
            longitude: Some(-0.1419),
        }
    }

    /// In-memory storage whose writes can be made to fail.
    #[derive(Debug)]
    struct BreakableStorage {
        inner: MemorySessionStorage,
        broken: Arc<AtomicBool>,
    }

    impl SessionStorage for BreakableStorage {
        fn load(&self) -> Result<Option<SessionState>, SessionError> {
            self.inner.load()
        }

        fn save(&mut self, state: &SessionState) -> Result<(), SessionError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(SessionError::Io(std::io::Error::other("disk full")));
            }

            self.inner.save(state)
        }
    }

    /// A directory that never answers.
    struct StalledDirectory;

    #[async_trait]
    impl RestaurantDirectory for StalledDirectory {
        async fn restaurant_by_slug(&self, _slug: &str) -> Result<Restaurant, ApiError> {
            std::future::pending().await
        }
    }

    fn session() -> Result<Session<MemorySessionStorage>, Box<dyn std::error::Error>> {
        seeded(MemorySessionStorage::default())
    }

    fn seeded<S: SessionStorage>(storage: S) -> Result<Session<S>, Box<dyn std::error::Error>> {
        let mut session = Session::open(storage, GBP)?;

        let item = CartItem::new(
            MenuItemRef {
                id: 11,
                name: "Pad Thai".to_string(),
                price: 11_75,
            },
            2,
            Customizations::default(),
            RestaurantRef::from(&restaurant()),
        )?;

        session.add_to_cart(item, CartConflictPolicy::Reject)?;
        session.set_customer_email("ada@example.com")?;

        Ok(session)
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            name: "Ada".to_string(),
            phone: "07700 900123".to_string(),
            address: "1 Analytical Row".to_string(),
            instructions: None,
        }
    }

    fn directory() -> MockRestaurantDirectory {
        let mut restaurants = MockRestaurantDirectory::new();
        restaurants
            .expect_restaurant_by_slug()
            .returning(|_| Ok(restaurant()));
        restaurants
    }

    fn service(
        restaurants: MockRestaurantDirectory,
        orders: MockOrderGateway,
        payments: MockPaymentProvider,
    ) -> CheckoutService {
        CheckoutService::new(
            Arc::new(restaurants),
            Arc::new(orders),
            Arc::new(payments),
            PricingPolicy::default(),
        )
    }

    fn created(id: i64) -> Result<OrderConfirmation, ApiError> {
        Ok(OrderConfirmation {
            id,
            status: Some("PENDING".to_string()),
        })
    }

    fn unavailable() -> ApiError {
        ApiError::UnexpectedResponse {
            status: 503,
            body: "maintenance".to_string(),
        }
    }

    #[tokio::test]
    async fn quote_without_location_uses_fallback_fee() -> TestResult {
        let session = session()?;
        let checkout = service(
            directory(),
            MockOrderGateway::new(),
            MockPaymentProvider::new(),
        );

        let quote = checkout.quote(session.state()).await?;

        assert_eq!(quote.distance_km, None);
        assert_eq!(quote.totals.subtotal(), Decimal::new(23_50, 2));
        assert_eq!(quote.totals.delivery_fee(), Decimal::new(2_50, 2));
        assert_eq!(quote.totals.grand_total(), Decimal::new(29_525, 3));

        Ok(())
    }

    #[tokio::test]
    async fn quote_with_location_charges_by_distance() -> TestResult {
        let mut session = session()?;
        session.set_location(CUSTOMER)?;
        let checkout = service(
            directory(),
            MockOrderGateway::new(),
            MockPaymentProvider::new(),
        );

        let quote = checkout.quote(session.state()).await?;
        let distance = quote.distance_km.ok_or("distance should be known")?;

        assert!((distance - 1.33).abs() < 0.05, "got {distance}");
        assert!(
            quote.totals.delivery_fee() < Decimal::ONE,
            "short hop should cost under 1.00"
        );

        Ok(())
    }

    #[tokio::test]
    async fn quote_survives_restaurant_lookup_failure() -> TestResult {
        let mut session = session()?;
        session.set_location(CUSTOMER)?;

        let mut restaurants = MockRestaurantDirectory::new();
        restaurants
            .expect_restaurant_by_slug()
            .once()
            .withf(|slug| slug == "noodle-bar")
            .returning(|_| Err(unavailable()));

        let checkout = service(restaurants, MockOrderGateway::new(), MockPaymentProvider::new());

        let quote = checkout.quote(session.state()).await?;

        assert_eq!(quote.restaurant, None);
        assert_eq!(quote.totals.delivery_fee(), Decimal::new(2_50, 2));

        Ok(())
    }

    #[tokio::test]
    async fn cash_order_is_submitted_once_without_payment() -> TestResult {
        let mut session = session()?;

        let mut orders = MockOrderGateway::new();
        orders
            .expect_submit_order()
            .once()
            .withf(|order| {
                order.details.payment_method == PaymentMethod::Cash
                    && order.payment_intent_id.is_none()
                    && order.details.total_amount == Decimal::new(29_53, 2)
            })
            .returning(|_| created(41));

        let mut payments = MockPaymentProvider::new();
        payments.expect_confirm_card_payment().never();

        let mut checkout = service(directory(), orders, payments);

        let receipt = checkout
            .submit(&mut session, &form(), PaymentMethod::Cash)
            .await?;

        assert_eq!(receipt.order_id, 41);
        assert_eq!(receipt.total, Money::from_minor(29_53, GBP));
        assert!(session.cart().is_empty(), "cart should be cleared");
        assert_eq!(checkout.state(), CheckoutState::Idle);

        Ok(())
    }

    #[tokio::test]
    async fn card_order_waits_for_payment() -> TestResult {
        let mut session = session()?;
        let mut sequence = Sequence::new();

        let mut payments = MockPaymentProvider::new();
        payments
            .expect_confirm_card_payment()
            .once()
            .in_sequence(&mut sequence)
            .withf(|request| request.amount == 29_53 && request.currency == "GBP")
            .returning(|_| {
                Ok(PaymentConfirmation {
                    payment_intent_id: "pi_42".to_string(),
                })
            });

        let mut orders = MockOrderGateway::new();
        orders
            .expect_submit_order()
            .once()
            .in_sequence(&mut sequence)
            .withf(|order| order.payment_intent_id.as_deref() == Some("pi_42"))
            .returning(|_| created(42));

        let mut checkout = service(directory(), orders, payments);

        let receipt = checkout
            .submit(&mut session, &form(), PaymentMethod::Card)
            .await?;

        assert_eq!(receipt.payment_intent_id.as_deref(), Some("pi_42"));
        assert!(session.cart().is_empty(), "cart should be cleared");

        Ok(())
    }

    #[tokio::test]
    async fn declined_card_never_creates_order() -> TestResult {
        let mut session = session()?;

        let mut payments = MockPaymentProvider::new();
        payments
            .expect_confirm_card_payment()
            .once()
            .returning(|_| Err(PaymentError::Declined("insufficient funds".to_string())));

        let mut orders = MockOrderGateway::new();
        orders.expect_submit_order().never();

        let mut checkout = service(directory(), orders, payments);

        let result = checkout
            .submit(&mut session, &form(), PaymentMethod::Card)
            .await;

        assert!(
            matches!(result, Err(CheckoutError::Payment(PaymentError::Declined(_)))),
            "got {result:?}"
        );
        assert_eq!(session.cart().len(), 1, "cart should be retained");
        assert_eq!(checkout.state(), CheckoutState::Idle);

        Ok(())
    }

    #[tokio::test]
    async fn paid_order_failure_is_distinct() -> TestResult {
        let mut session = session()?;

        let mut payments = MockPaymentProvider::new();
        payments.expect_confirm_card_payment().once().returning(|_| {
            Ok(PaymentConfirmation {
                payment_intent_id: "pi_lost".to_string(),
            })
        });

        let mut orders = MockOrderGateway::new();
        orders
            .expect_submit_order()
            .once()
            .returning(|_| Err(unavailable()));

        let mut checkout = service(directory(), orders, payments);

        let result = checkout
            .submit(&mut session, &form(), PaymentMethod::Card)
            .await;

        assert!(
            matches!(
                &result,
                Err(CheckoutError::PaidOrderFailed { payment_intent_id, .. }) if payment_intent_id == "pi_lost"
            ),
            "got {result:?}"
        );
        assert_eq!(session.cart().len(), 1, "cart should be retained");

        Ok(())
    }

    #[tokio::test]
    async fn invalid_form_submits_nothing() -> TestResult {
        let mut session = session()?;

        let mut orders = MockOrderGateway::new();
        orders.expect_submit_order().never();

        let mut payments = MockPaymentProvider::new();
        payments.expect_confirm_card_payment().never();

        let mut checkout = service(MockRestaurantDirectory::new(), orders, payments);

        let result = checkout
            .submit(&mut session, &CheckoutForm::default(), PaymentMethod::Cash)
            .await;

        assert!(
            matches!(&result, Err(CheckoutError::Validation(errors)) if errors.fields().len() == 3),
            "got {result:?}"
        );
        assert_eq!(checkout.state(), CheckoutState::Idle);

        Ok(())
    }

    #[tokio::test]
    async fn empty_cart_submits_nothing() -> TestResult {
        let mut session = Session::open(MemorySessionStorage::default(), GBP)?;
        session.set_customer_email("ada@example.com")?;

        let mut orders = MockOrderGateway::new();
        orders.expect_submit_order().never();

        let mut checkout = service(
            MockRestaurantDirectory::new(),
            orders,
            MockPaymentProvider::new(),
        );

        let result = checkout
            .submit(&mut session, &form(), PaymentMethod::Cash)
            .await;

        assert!(matches!(result, Err(CheckoutError::EmptyCart)), "got {result:?}");

        Ok(())
    }

    #[tokio::test]
    async fn retry_reuses_idempotency_key() -> TestResult {
        let mut session = session()?;
        let seen = OnceLock::new();
        let mut attempts = 0;

        let mut orders = MockOrderGateway::new();
        orders
            .expect_submit_order()
            .times(2)
            .withf(move |order| *seen.get_or_init(|| order.idempotency_key) == order.idempotency_key)
            .returning(move |_| {
                attempts += 1;

                if attempts == 1 {
                    Err(unavailable())
                } else {
                    created(43)
                }
            });

        let mut checkout = service(directory(), orders, MockPaymentProvider::new());

        let failed = checkout
            .submit(&mut session, &form(), PaymentMethod::Cash)
            .await;

        assert!(
            matches!(failed, Err(CheckoutError::OrderSubmission(_))),
            "got {failed:?}"
        );
        assert_eq!(session.cart().len(), 1, "cart should be retained");

        let receipt = checkout
            .submit(&mut session, &form(), PaymentMethod::Cash)
            .await?;

        assert_eq!(receipt.order_id, 43);

        Ok(())
    }

    #[tokio::test]
    async fn changed_order_rotates_idempotency_key() -> TestResult {
        let mut session = session()?;
        let seen = Arc::new(OnceLock::new());
        let mut sequence = Sequence::new();

        let first = Arc::clone(&seen);
        let second = Arc::clone(&seen);

        let mut orders = MockOrderGateway::new();
        orders
            .expect_submit_order()
            .once()
            .in_sequence(&mut sequence)
            .withf(move |order| *first.get_or_init(|| order.idempotency_key) == order.idempotency_key)
            .returning(|_| Err(unavailable()));
        orders
            .expect_submit_order()
            .once()
            .in_sequence(&mut sequence)
            .withf(move |order| second.get().is_some_and(|key| *key != order.idempotency_key))
            .returning(|_| created(44));

        let mut checkout = service(directory(), orders, MockPaymentProvider::new());

        let failed = checkout
            .submit(&mut session, &form(), PaymentMethod::Cash)
            .await;

        assert!(failed.is_err(), "first attempt should fail");

        let changed = CheckoutForm {
            address: "2 Difference Lane".to_string(),
            ..form()
        };

        let receipt = checkout
            .submit(&mut session, &changed, PaymentMethod::Cash)
            .await?;

        assert_eq!(receipt.order_id, 44);

        Ok(())
    }

    #[tokio::test]
    async fn declined_card_retry_gets_new_key() -> TestResult {
        let mut session = session()?;
        let keys = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&keys);
        let mut attempts = 0;

        let mut payments = MockPaymentProvider::new();
        payments
            .expect_confirm_card_payment()
            .times(2)
            .returning(move |request| {
                if let Ok(mut keys) = recorded.lock() {
                    keys.push(request.idempotency_key);
                }

                attempts += 1;

                if attempts == 1 {
                    Err(PaymentError::Declined("card expired".to_string()))
                } else {
                    Ok(PaymentConfirmation {
                        payment_intent_id: "pi_second_card".to_string(),
                    })
                }
            });

        let mut orders = MockOrderGateway::new();
        orders
            .expect_submit_order()
            .once()
            .withf(|order| order.payment_intent_id.as_deref() == Some("pi_second_card"))
            .returning(|_| created(46));

        let mut checkout = service(directory(), orders, payments);

        let declined = checkout
            .submit(&mut session, &form(), PaymentMethod::Card)
            .await;

        assert!(
            matches!(declined, Err(CheckoutError::Payment(PaymentError::Declined(_)))),
            "got {declined:?}"
        );

        let receipt = checkout
            .submit(&mut session, &form(), PaymentMethod::Card)
            .await?;

        assert_eq!(receipt.order_id, 46);

        let keys = keys.lock().map_err(|err| err.to_string())?.clone();
        let [first, second] = keys.as_slice() else {
            return Err(format!("expected two payment attempts, got {keys:?}").into());
        };

        assert_ne!(first, second, "a declined payment should not pin the key");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_submit_returns_to_idle() -> TestResult {
        let mut session = session()?;

        let mut orders = MockOrderGateway::new();
        orders.expect_submit_order().never();

        let mut checkout = CheckoutService::new(
            Arc::new(StalledDirectory),
            Arc::new(orders),
            Arc::new(MockPaymentProvider::new()),
            PricingPolicy::default(),
        );

        let attempt = tokio::time::timeout(
            Duration::from_secs(5),
            checkout.submit(&mut session, &form(), PaymentMethod::Cash),
        )
        .await;

        assert!(attempt.is_err(), "submit should still be waiting on the restaurant");
        assert_eq!(checkout.state(), CheckoutState::Idle);

        let retry = checkout
            .submit(&mut session, &CheckoutForm::default(), PaymentMethod::Cash)
            .await;

        assert!(
            matches!(retry, Err(CheckoutError::Validation(_))),
            "a new attempt should start from idle, got {retry:?}"
        );
        assert_eq!(session.cart().len(), 1, "cart should be retained");

        Ok(())
    }

    #[tokio::test]
    async fn unsaved_cart_clear_keeps_idempotency_key() -> TestResult {
        let broken = Arc::new(AtomicBool::new(false));
        let mut session = seeded(BreakableStorage {
            inner: MemorySessionStorage::default(),
            broken: Arc::clone(&broken),
        })?;

        broken.store(true, Ordering::SeqCst);

        let seen = OnceLock::new();

        let mut orders = MockOrderGateway::new();
        orders
            .expect_submit_order()
            .times(2)
            .withf(move |order| *seen.get_or_init(|| order.idempotency_key) == order.idempotency_key)
            .returning(|_| created(47));

        let mut checkout = service(directory(), orders, MockPaymentProvider::new());

        let receipt = checkout
            .submit(&mut session, &form(), PaymentMethod::Cash)
            .await?;

        assert_eq!(receipt.order_id, 47);
        assert_eq!(session.cart().len(), 1, "failed save leaves the cart in place");

        let replay = checkout
            .submit(&mut session, &form(), PaymentMethod::Cash)
            .await?;

        assert_eq!(replay.order_id, 47);
        assert_eq!(checkout.state(), CheckoutState::Idle);

        Ok(())
    }
}
