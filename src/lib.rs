#![doc = include_str!("../README.md")]

pub mod config;
pub mod csrf;
pub mod error;
pub mod moneybird;
pub mod oauth;
pub mod token;
pub mod types;
pub mod web;

// Re-exports for convenient access
pub use config::AppConfig;
pub use csrf::generate_state;
pub use error::Error;
pub use moneybird::ApiClient;
pub use oauth::{AuthClient, AuthorizationRequest, OAuthConfig};
pub use token::{should_refresh, RefreshGate, TokenError, REFRESH_SKEW_SECS};
pub use types::{
    Administration, AdministrationId, Invoice, InvoiceId, InvoiceState, TokenResponse,
};
