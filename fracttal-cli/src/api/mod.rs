//! Fracttal Web API module
//!
//! Client-credentials authentication, meter lookups and meter reading updates.

pub mod client;
pub mod models;
pub mod resilience;

pub use client::{FracttalClient, MeterApi};
