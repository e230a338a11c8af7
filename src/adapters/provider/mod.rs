//! Provider OAuth client used when a tenant connects a billing account.

mod oauth;

pub use oauth::{ProviderError, ProviderOAuthClient, ProviderTokens, ProviderUser};
