//! Engagement gate — sign-up prompt gating for guest installations.

pub mod config;
pub mod engagement;
pub mod error;
pub mod persistence;
