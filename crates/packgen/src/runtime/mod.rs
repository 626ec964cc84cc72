//! Support routines every generated file carries.
//!
//! The routines live in `support.rs`, which is compiled here so it can be tested,
//! and copied verbatim into the top of each generated artifact through
//! [`SOURCE`]. Generated code therefore only depends on `std`.
//!
//! Words are 32 bits, little-endian. Bit `n` of a descriptor is bit `n % 32` of
//! word `n / 32`.

include!("support.rs");

/// Text of the support routines, as emitted into generated files.
pub const SOURCE: &str = include_str!("support.rs");
