//! Checkout configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CHECKOUT_BASE_URL` - Public URL of the checkout service
//! - `CHECKOUT_DATABASE_URL` - `PostgreSQL` connection string for the session store
//!   (falls back to `DATABASE_URL`)
//! - `CHECKOUT_BACKEND_URL` - Base URL of the commerce backend API
//! - `CHECKOUT_BACKEND_TOKEN` - Bearer token for the commerce backend
//!
//! ## Optional
//! - `CHECKOUT_HOST` - Bind address (default: 127.0.0.1)
//! - `CHECKOUT_PORT` - Listen port (default: 3000)
//! - `CHECKOUT_DIRECTORY_PATH` - Country/region reference data
//!   (default: `crates/checkout/data/directory.json`)
//! - `KLAVIYO_API_KEY` + `KLAVIYO_LIST_ID` - Newsletter subscriptions via Klaviyo
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! ## Store behaviour
//!
//! Every `CHECKOUT_*` setting documented on [`CheckoutSettings`] is optional
//! and falls back to [`CheckoutSettings::default`].

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use onepage_core::{CountryCode, OrderStatus, PaymentAction};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Process-level configuration for the checkout binary.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// `PostgreSQL` connection URL for the session store (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the checkout
    pub base_url: String,
    /// Path to the country/region reference data
    pub directory_path: PathBuf,
    /// Commerce backend connection
    pub backend: BackendConfig,
    /// Klaviyo newsletter integration, when configured
    pub klaviyo: Option<KlaviyoConfig>,
    /// Store behaviour settings
    pub settings: CheckoutSettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Commerce backend API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://shop.example/api/checkout`
    pub base_url: String,
    /// Bearer token
    pub token: SecretString,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Klaviyo API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct KlaviyoConfig {
    /// Private API key
    pub api_key: SecretString,
    /// Newsletter list id
    pub list_id: String,
}

impl std::fmt::Debug for KlaviyoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KlaviyoConfig")
            .field("api_key", &"[REDACTED]")
            .field("list_id", &self.list_id)
            .finish()
    }
}

// =============================================================================
// Store Behaviour
// =============================================================================

/// How the location is collected on the checkout form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocationType {
    /// One free-text field: "Country, Region, City".
    #[default]
    One,
    /// Discrete country, region and city fields.
    Few,
}

impl FromStr for LocationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one" => Ok(Self::One),
            "few" => Ok(Self::Few),
            other => Err(format!("expected one|few, got {other:?}")),
        }
    }
}

/// Where the password of a newly registered account comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PasswordType {
    /// The submitted `user[password]` field.
    Field,
    /// Derived from the telephone number.
    Phone,
    /// Always random.
    #[default]
    Generate,
}

impl FromStr for PasswordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "field" => Ok(Self::Field),
            "phone" => Ok(Self::Phone),
            "generate" => Ok(Self::Generate),
            other => Err(format!("expected field|phone|generate, got {other:?}")),
        }
    }
}

/// Newsletter checkbox visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NewsletterVisibility {
    /// No checkbox; never subscribe.
    Invisible,
    /// Checkbox shown, unchecked.
    #[default]
    Unchecked,
    /// Checkbox shown, pre-checked.
    Checked,
}

impl NewsletterVisibility {
    /// Whether the opt-in checkbox is rendered at all.
    #[must_use]
    pub const fn is_visible(self) -> bool {
        !matches!(self, Self::Invisible)
    }
}

impl FromStr for NewsletterVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invisible" => Ok(Self::Invisible),
            "unchecked" => Ok(Self::Unchecked),
            "checked" => Ok(Self::Checked),
            other => Err(format!("expected invisible|unchecked|checked, got {other:?}")),
        }
    }
}

/// Minimum order amount rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimumOrder {
    /// Lowest accepted cart subtotal.
    pub amount: Decimal,
    /// Message shown when the subtotal is below `amount`.
    pub message: String,
}

/// Automatic invoicing of orders whose grand total is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZeroSubtotalSettings {
    /// Payment action configured for the zero-subtotal payment method.
    pub payment_action: PaymentAction,
    /// Status new zero-subtotal orders are created in.
    pub order_status: OrderStatus,
}

impl ZeroSubtotalSettings {
    /// True when a zero-total order should be invoiced right away.
    #[must_use]
    pub fn auto_invoice(&self) -> bool {
        self.payment_action == PaymentAction::AuthorizeCapture
            && self.order_status == OrderStatus::Pending
    }
}

/// Store behaviour for the checkout flow.
///
/// | Variable | Field | Default |
/// |---|---|---|
/// | `CHECKOUT_DEFAULT_COUNTRY` | `default_country` | `US` |
/// | `CHECKOUT_DEFAULT_REGION` | `default_region` | unset |
/// | `CHECKOUT_DEFAULT_CITY` | `default_city` | unset |
/// | `CHECKOUT_USE_ONLY_DEFAULT_COUNTRY` | `use_only_default_country` | `false` |
/// | `CHECKOUT_LOCATION_TYPE` | `location_type` | `one` |
/// | `CHECKOUT_PASSWORD_TYPE` | `password_type` | `generate` |
/// | `CHECKOUT_NEWSLETTER` | `newsletter` | `unchecked` |
/// | `CHECKOUT_GUEST_MAY_SUBSCRIBE` | `guest_may_subscribe` | `true` |
/// | `CHECKOUT_NEWSLETTER_SEND_REQUEST` | `newsletter_send_request` | `false` |
/// | `CHECKOUT_NEWSLETTER_SEND_SUCCESS` | `newsletter_send_success` | `true` |
/// | `CHECKOUT_MINIMUM_ORDER_AMOUNT` / `_MESSAGE` | `minimum_order` | unset |
/// | `CHECKOUT_REQUIRED_AGREEMENTS` | `required_agreements` | empty |
/// | `CHECKOUT_ZERO_SUBTOTAL_PAYMENT_ACTION` | `zero_subtotal.payment_action` | `authorize` |
/// | `CHECKOUT_ZERO_SUBTOTAL_ORDER_STATUS` | `zero_subtotal.order_status` | `pending` |
/// | `CHECKOUT_AUTOCOMPLETE_LIMIT` | `autocomplete_limit` | `15` |
/// | `CHECKOUT_CART_URL` | `cart_url` | `/checkout/cart` |
/// | `CHECKOUT_SUCCESS_URL` | `success_url` | `/checkout/success` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    pub default_country: CountryCode,
    pub default_region: Option<String>,
    pub default_city: Option<String>,
    pub use_only_default_country: bool,
    pub location_type: LocationType,
    pub password_type: PasswordType,
    pub newsletter: NewsletterVisibility,
    pub guest_may_subscribe: bool,
    pub newsletter_send_request: bool,
    pub newsletter_send_success: bool,
    pub minimum_order: Option<MinimumOrder>,
    pub required_agreements: Vec<String>,
    pub zero_subtotal: ZeroSubtotalSettings,
    pub autocomplete_limit: usize,
    pub cart_url: String,
    pub success_url: String,
}

/// Default minimum order message when only the amount is configured.
const DEFAULT_MINIMUM_ORDER_MESSAGE: &str = "Your order does not meet the minimum order amount.";

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            default_country: CountryCode::us(),
            default_region: None,
            default_city: None,
            use_only_default_country: false,
            location_type: LocationType::default(),
            password_type: PasswordType::default(),
            newsletter: NewsletterVisibility::default(),
            guest_may_subscribe: true,
            newsletter_send_request: false,
            newsletter_send_success: true,
            minimum_order: None,
            required_agreements: Vec::new(),
            zero_subtotal: ZeroSubtotalSettings::default(),
            autocomplete_limit: 15,
            cart_url: "/checkout/cart".to_string(),
            success_url: "/checkout/success".to_string(),
        }
    }
}

impl CheckoutSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let minimum_order = get_optional_env("CHECKOUT_MINIMUM_ORDER_AMOUNT")
            .map(|raw| {
                let amount = parse_env::<Decimal>("CHECKOUT_MINIMUM_ORDER_AMOUNT", &raw)?;
                let message = get_env_or_default(
                    "CHECKOUT_MINIMUM_ORDER_MESSAGE",
                    DEFAULT_MINIMUM_ORDER_MESSAGE,
                );
                Ok::<_, ConfigError>(MinimumOrder { amount, message })
            })
            .transpose()?;

        Ok(Self {
            default_country: get_parsed_or("CHECKOUT_DEFAULT_COUNTRY", defaults.default_country)?,
            default_region: get_optional_env("CHECKOUT_DEFAULT_REGION"),
            default_city: get_optional_env("CHECKOUT_DEFAULT_CITY"),
            use_only_default_country: get_flag("CHECKOUT_USE_ONLY_DEFAULT_COUNTRY", false)?,
            location_type: get_parsed_or("CHECKOUT_LOCATION_TYPE", defaults.location_type)?,
            password_type: get_parsed_or("CHECKOUT_PASSWORD_TYPE", defaults.password_type)?,
            newsletter: get_parsed_or("CHECKOUT_NEWSLETTER", defaults.newsletter)?,
            guest_may_subscribe: get_flag("CHECKOUT_GUEST_MAY_SUBSCRIBE", true)?,
            newsletter_send_request: get_flag("CHECKOUT_NEWSLETTER_SEND_REQUEST", false)?,
            newsletter_send_success: get_flag("CHECKOUT_NEWSLETTER_SEND_SUCCESS", true)?,
            minimum_order,
            required_agreements: get_optional_env("CHECKOUT_REQUIRED_AGREEMENTS")
                .map(|raw| parse_list(&raw))
                .unwrap_or_default(),
            zero_subtotal: ZeroSubtotalSettings {
                payment_action: get_parsed_or(
                    "CHECKOUT_ZERO_SUBTOTAL_PAYMENT_ACTION",
                    defaults.zero_subtotal.payment_action,
                )?,
                order_status: get_parsed_or(
                    "CHECKOUT_ZERO_SUBTOTAL_ORDER_STATUS",
                    defaults.zero_subtotal.order_status,
                )?,
            },
            autocomplete_limit: get_parsed_or(
                "CHECKOUT_AUTOCOMPLETE_LIMIT",
                defaults.autocomplete_limit,
            )?,
            cart_url: get_env_or_default("CHECKOUT_CART_URL", &defaults.cart_url),
            success_url: get_env_or_default("CHECKOUT_SUCCESS_URL", &defaults.success_url),
        })
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("CHECKOUT_DATABASE_URL")?;
        let host = get_parsed_or("CHECKOUT_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = get_parsed_or("CHECKOUT_PORT", 3000_u16)?;
        let base_url = get_required_url("CHECKOUT_BASE_URL")?;
        let directory_path = PathBuf::from(get_env_or_default(
            "CHECKOUT_DIRECTORY_PATH",
            "crates/checkout/data/directory.json",
        ));

        let backend = BackendConfig {
            base_url: get_required_url("CHECKOUT_BACKEND_URL")?,
            token: get_required_secret("CHECKOUT_BACKEND_TOKEN")?,
        };

        let klaviyo = match (
            get_optional_env("KLAVIYO_API_KEY"),
            get_optional_env("KLAVIYO_LIST_ID"),
        ) {
            (Some(api_key), Some(list_id)) => Some(KlaviyoConfig {
                api_key: SecretString::from(api_key),
                list_id,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            directory_path,
            backend,
            klaviyo,
            settings: CheckoutSettings::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable that must be an absolute URL.
fn get_required_url(key: &str) -> Result<String, ConfigError> {
    let value = get_required_env(key)?;
    url::Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(value)
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable; blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional environment variable, falling back to `default`.
fn get_parsed_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| parse_env(key, &raw))
}

fn get_flag(key: &str, default: bool) -> Result<bool, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| parse_flag(key, &raw))
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Accepts the usual spellings of a boolean switch.
fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got {other:?}"),
        )),
    }
}

/// Split a comma separated list, dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
