//! Green Credits: the ledger and rewards engine behind the campus e-waste programme.
//!
//! The [`engine`] module holds the domain (tiers, credit rates, recommendations, the
//! submission lifecycle, the credit ledger, and reward redemption) behind the
//! [`engine::GreenCreditsService`] facade. [`router`] exposes that facade over HTTP.

pub mod config;
pub mod engine;
pub mod error;
pub mod router;
pub mod telemetry;
