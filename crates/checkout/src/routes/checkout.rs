//! Checkout form endpoints.

use std::collections::BTreeMap;

use askama::Template;
use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::address::AddressResolver;
use crate::error::Result;
use crate::location::{LocationParser, LocationQuery, location_label};
use crate::middleware::OptionalCustomer;
use crate::models::session::{cart_id, load_checkout_state, store_checkout_state};
use crate::models::{
    Cart, PaymentInput, PaymentMethod, PlaceOrderRequest, PlacementResponse, RateGroups,
    UserPayload, non_empty,
};
use crate::placement::PlacementContext;
use crate::shipping;
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// One rate in the shipping methods fragment.
pub struct RateView {
    pub code: String,
    pub title: String,
    pub price: String,
    pub checked: bool,
}

/// One carrier and its rates.
pub struct CarrierView {
    pub title: String,
    pub rates: Vec<RateView>,
}

#[derive(Template)]
#[template(path = "checkout/shipping_methods.html")]
pub struct ShippingMethodsTemplate {
    pub carriers: Vec<CarrierView>,
}

impl ShippingMethodsTemplate {
    fn new(groups: &RateGroups, selected: Option<&str>) -> Self {
        let carriers = groups
            .iter()
            .map(|(code, rates)| CarrierView {
                title: rates
                    .first()
                    .map_or_else(|| code.clone(), |r| r.carrier_title.clone()),
                rates: rates
                    .iter()
                    .map(|rate| RateView {
                        code: rate.code.clone(),
                        title: rate.method_title.clone(),
                        price: rate.price.to_string(),
                        checked: selected == Some(rate.code.as_str()),
                    })
                    .collect(),
            })
            .collect();
        Self { carriers }
    }
}

#[derive(Template)]
#[template(path = "checkout/payment_methods.html")]
pub struct PaymentMethodsTemplate {
    pub methods: Vec<PaymentMethod>,
}

#[derive(Template)]
#[template(path = "checkout/totals.html")]
pub struct TotalsTemplate {
    pub subtotal: String,
    pub shipping: String,
    pub discount: Option<String>,
    pub grand_total: String,
}

impl From<&Cart> for TotalsTemplate {
    fn from(cart: &Cart) -> Self {
        let totals = &cart.totals;
        Self {
            subtotal: totals.subtotal.to_string(),
            shipping: totals.shipping.to_string(),
            discount: (!totals.discount.is_zero()).then(|| totals.discount.to_string()),
            grand_total: totals.grand_total.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "checkout/verify.html")]
pub struct VerifyTemplate {
    pub url: Option<String>,
}

// =============================================================================
// Prefill
// =============================================================================

/// Remembered form values, returned by `GET /checkout/prefill`.
#[derive(Debug, Default, Serialize)]
pub struct Prefill {
    /// Single-field text for the resolved location.
    pub location: String,
    pub shipping_method: Option<String>,
    /// Last submitted `user` section, without the password.
    pub user: Option<UserPayload>,
}

/// Values to refill the checkout form with.
#[instrument(skip(state, session))]
pub async fn prefill(State(state): State<AppState>, session: Session) -> Result<Json<Prefill>> {
    let checkout_state = load_checkout_state(&session).await?;
    let settings = state.settings();
    let fragment = AddressResolver::new(settings).resolve(None, &checkout_state);

    Ok(Json(Prefill {
        location: location_label(&fragment, state.directory(), settings),
        shipping_method: checkout_state.last_shipping_method,
        user: checkout_state.last_user_payload,
    }))
}

// =============================================================================
// Update
// =============================================================================

/// Form posted by `POST /checkout/update`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateForm {
    /// Comma list of sections to render: `shipping`, `payment`, `totals`.
    #[serde(rename = "type")]
    pub sections: String,
    /// Single-field location text.
    pub value: Option<String>,
    pub country_id: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub shipping_method: Option<String>,
}

impl UpdateForm {
    fn location_query(&self) -> LocationQuery {
        LocationQuery {
            value: self.value.clone(),
            country_id: self.country_id.clone(),
            region: self.region.clone(),
            city: self.city.clone(),
            postcode: self.postcode.clone(),
        }
    }
}

/// Recalculate the cart for the current form and render the requested
/// sections.
///
/// Responds with an empty object when there is nothing to update.
#[instrument(skip(state, session, form), fields(sections = %form.sections))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateForm>,
) -> Result<Json<BTreeMap<String, String>>> {
    let mut rendered = BTreeMap::new();

    let sections: Vec<&str> = form
        .sections
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sections.is_empty() {
        return Ok(Json(rendered));
    }

    let Some(cart_id) = cart_id(&session).await? else {
        return Ok(Json(rendered));
    };
    let services = state.services();
    let Some(mut cart) = services
        .carts
        .load(cart_id)
        .await?
        .filter(|c| c.is_active && c.has_items())
    else {
        return Ok(Json(rendered));
    };

    let settings = state.settings();
    let mut checkout_state = load_checkout_state(&session).await?;

    let query = form.location_query();
    let parsed = (sections.contains(&"shipping") && !query.is_blank()).then(|| {
        LocationParser::new(state.directory(), settings).parse(&query, settings.location_type)
    });
    if let Some(method) = non_empty(form.shipping_method.clone()) {
        checkout_state.last_shipping_method = Some(method);
    }

    let resolver = AddressResolver::new(settings);
    let fragment = resolver.resolve(parsed.as_ref(), &checkout_state);
    resolver.apply(&fragment, &checkout_state, &mut cart);
    if parsed.is_some() {
        checkout_state.last_address = Some(fragment);
    }

    let selection =
        shipping::auto_assign(cart.id, &mut cart.shipping_address, services.rates.as_ref())
            .await?;

    cart.totals_collected = false;
    services.checkout.collect_totals(&mut cart).await?;
    services.carts.save(&cart).await?;
    store_checkout_state(&session, &checkout_state).await?;

    for section in sections {
        let html = match section {
            "shipping" => ShippingMethodsTemplate::new(
                &selection.groups,
                cart.shipping_address.shipping_method.as_deref(),
            )
            .render()?,
            "payment" => PaymentMethodsTemplate {
                methods: services.payments.available_methods(&cart).await?,
            }
            .render()?,
            "totals" => TotalsTemplate::from(&cart).render()?,
            other => {
                tracing::debug!(section = other, "Unknown update section ignored");
                continue;
            }
        };
        rendered.insert(section.to_string(), html);
    }

    Ok(Json(rendered))
}

// =============================================================================
// Place
// =============================================================================

/// Place the order.
#[instrument(skip(state, session, customer, request))]
pub async fn place(
    State(state): State<AppState>,
    OptionalCustomer(customer): OptionalCustomer,
    session: Session,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<Json<PlacementResponse>> {
    let cart_id = cart_id(&session).await?;
    let mut checkout_state = load_checkout_state(&session).await?;

    let result = state
        .placement()
        .place(
            cart_id,
            &request,
            PlacementContext {
                is_post: true,
                customer: customer.as_ref(),
                session: &mut checkout_state,
            },
        )
        .await;

    store_checkout_state(&session, &checkout_state).await?;
    Ok(Json(result.into()))
}

// =============================================================================
// Verify
// =============================================================================

/// Body of `POST /checkout/verify`.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub payment: PaymentInput,
}

/// Response of `POST /checkout/verify`; `url` is empty when no challenge is
/// needed.
#[derive(Debug, Default, Serialize)]
pub struct VerifyResponse {
    pub url: String,
    pub html: String,
}

/// Save the payment data and ask whether the card needs verification.
#[instrument(skip(state, session, request))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let Some(cart_id) = cart_id(&session).await? else {
        return Ok(Json(VerifyResponse::default()));
    };
    let services = state.services();
    let Some(mut cart) = services.carts.load(cart_id).await? else {
        return Ok(Json(VerifyResponse::default()));
    };

    services
        .payments
        .save_payment(&mut cart, &request.payment)
        .await?;
    let url = services.payments.verification_url(&cart).await?;
    tracing::debug!(cart_id = %cart_id, challenge = url.is_some(), "Card verification checked");

    let html = VerifyTemplate { url: url.clone() }.render()?;
    Ok(Json(VerifyResponse {
        url: url.unwrap_or_default(),
        html,
    }))
}

// =============================================================================
// Reset
// =============================================================================

/// Forget everything remembered about this checkout.
#[instrument(skip(session))]
pub async fn reset(session: Session) -> Result<impl IntoResponse> {
    let mut checkout_state = load_checkout_state(&session).await?;
    checkout_state.reset();
    store_checkout_state(&session, &checkout_state).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use onepage_core::{CartId, Money};
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::{Address, CartTotals, ShippingRate};

    fn rate(code: &str, title: &str) -> ShippingRate {
        ShippingRate {
            code: code.to_string(),
            carrier_title: "United Parcel Service".to_string(),
            method_title: title.to_string(),
            price: Money {
                amount: Decimal::new(995, 2),
                ..Money::default()
            },
        }
    }

    #[test]
    fn test_shipping_fragment_marks_selected_rate() {
        let groups: RateGroups = [(
            "ups".to_string(),
            vec![rate("ups_ground", "Ground"), rate("ups_air", "Next Day Air")],
        )]
        .into_iter()
        .collect();

        let html = ShippingMethodsTemplate::new(&groups, Some("ups_air"))
            .render()
            .unwrap();

        assert!(html.contains("United Parcel Service"));
        assert!(html.contains(r#"value="ups_air" checked="checked""#));
        assert!(!html.contains(r#"value="ups_ground" checked"#));
        assert!(html.contains("$9.95"));
    }

    #[test]
    fn test_shipping_fragment_without_rates() {
        let html = ShippingMethodsTemplate::new(&RateGroups::new(), None)
            .render()
            .unwrap();
        assert!(html.contains("no quotes are available"));
    }

    #[test]
    fn test_totals_fragment_hides_zero_discount() {
        let cart = Cart {
            id: CartId::new(1),
            items_count: 1,
            has_error: false,
            is_multi_shipping: false,
            is_virtual: false,
            is_active: true,
            checkout_method: None,
            shipping_address: Address::default(),
            billing_address: Address::default(),
            totals: CartTotals {
                subtotal: Money {
                    amount: Decimal::new(2000, 2),
                    ..Money::default()
                },
                ..CartTotals::default()
            },
            totals_collected: true,
        };

        let html = TotalsTemplate::from(&cart).render().unwrap();
        assert!(html.contains("$20.00"));
        assert!(!html.contains("Discount"));
    }

    #[test]
    fn test_verify_fragment() {
        let challenge = VerifyTemplate {
            url: Some("https://acs.example.com/challenge".to_string()),
        }
        .render()
        .unwrap();
        assert!(challenge.contains("https://acs.example.com/challenge"));

        let done = VerifyTemplate { url: None }.render().unwrap();
        assert!(done.contains("Verification complete"));
    }
}
