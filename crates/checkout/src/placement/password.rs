//! Passwords for accounts created at checkout.

use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::SecretString;

use crate::config::PasswordType;
use crate::models::UserPayload;

/// Shortest password derived from a telephone number.
const PHONE_MIN_LEN: usize = 6;

/// Length of a generated password.
const GENERATED_LEN: usize = 8;

/// Password for the account a `register` checkout creates.
///
/// Falls back to a generated one whenever the configured source is empty.
#[must_use]
pub fn derive_password(strategy: PasswordType, user: &UserPayload) -> SecretString {
    let derived = match strategy {
        PasswordType::Field => user.password.clone().filter(|p| !p.is_empty()),
        PasswordType::Phone => user
            .address
            .telephone
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(pad_phone),
        PasswordType::Generate => None,
    };

    SecretString::from(derived.unwrap_or_else(|| random_key(GENERATED_LEN)))
}

/// Left-pad a short telephone number with random characters.
fn pad_phone(phone: &str) -> String {
    let missing = PHONE_MIN_LEN.saturating_sub(phone.chars().count());
    let mut password = random_key(missing);
    password.push_str(phone);
    password
}

fn random_key(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
