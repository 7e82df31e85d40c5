//! Newtype IDs for type-safe entity references.
//!
//! Every record the checkout touches (carts, orders, customers, saved
//! addresses, regions) is owned by an external system and addressed by an
//! integer key. The `define_id!` macro keeps those keys from being mixed up.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>`, `Into<i32>` and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use onepage_core::define_id;
/// define_id!(QuoteId);
/// define_id!(ShipmentId);
///
/// let quote_id = QuoteId::new(1);
/// let parsed: QuoteId = "42".parse().unwrap();
/// assert_eq!(parsed.as_i32(), 42);
///
/// // These are different types, so this won't compile:
/// // let _: QuoteId = ShipmentId::new(1);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(CartId);
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(CustomerId);
define_id!(AddressId);
define_id!(RegionId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let id: RegionId = " 12 ".parse().unwrap();
        assert_eq!(id, RegionId::new(12));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("kyiv".parse::<RegionId>().is_err());
        assert!("".parse::<AddressId>().is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&CartId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: CartId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_i32(), 7);
    }
}
