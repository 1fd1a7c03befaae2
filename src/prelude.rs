//! ChopNow prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    api::{ApiClient, ApiClientConfig, ApiError},
    cart::{Cart, CartConflictPolicy, CartError, CartItem, RestaurantRef},
    checkout::{
        CheckoutError, CheckoutField, CheckoutForm, CheckoutQuote, CheckoutReceipt,
        CheckoutService, CheckoutState, ValidationErrors,
    },
    fees::{DeliveryFeePolicy, FeeError, delivery_fee},
    geo::{Coordinate, CoordinateError, distance_km, round_km},
    geolocation::{
        FixedGeolocator, GeolocationError, Geolocator, NominatimConfig, NominatimGeocoder,
        ReverseGeocoder, capture_location, locate,
    },
    menu::{Customization, CustomizationChoice, Customizations, MenuItemRef},
    orders::{OrderConfirmation, OrderDetails, OrderGateway, OrderRequest, PaymentMethod},
    payments::{CardPaymentsUnavailable, PaymentError, PaymentProvider},
    pricing::{CheckoutTotals, PricingError, PricingPolicy, TotalPriceError},
    restaurants::{Restaurant, RestaurantDirectory},
    session::{
        FileSessionStorage, MemorySessionStorage, Session, SessionError, SessionState,
        SessionStorage,
    },
    summary::{QuoteSummary, SummaryError},
};
