//! Domain action ports - the host application's handlers for logged events.
//!
//! The host owns the orders/catalog/inventory/payments schema. The event
//! dispatcher logs each action and routes it to one of these traits by its
//! `DomainEventType`. Each method receives the event payload and returns the
//! handler's result, which the dispatcher hands back to its caller.
//!
//! Handlers must be idempotent within their own operation; the dispatcher
//! does not retry.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::foundation::DomainError;

#[async_trait]
pub trait OrderActions: Send + Sync {
    async fn created(&self, payload: &Value) -> Result<Value, DomainError>;
    async fn updated(&self, payload: &Value) -> Result<Value, DomainError>;
    async fn status_changed(&self, payload: &Value) -> Result<Value, DomainError>;
    async fn deleted(&self, payload: &Value) -> Result<Value, DomainError>;
    async fn item_added(&self, payload: &Value) -> Result<Value, DomainError>;
    async fn item_removed(&self, payload: &Value) -> Result<Value, DomainError>;
}

/// Products and categories.
#[async_trait]
pub trait CatalogActions: Send + Sync {
    async fn product_created(&self, payload: &Value) -> Result<Value, DomainError>;
    async fn product_updated(&self, payload: &Value) -> Result<Value, DomainError>;
    async fn product_deleted(&self, payload: &Value) -> Result<Value, DomainError>;
    async fn category_created(&self, payload: &Value) -> Result<Value, DomainError>;
    async fn category_updated(&self, payload: &Value) -> Result<Value, DomainError>;
    async fn category_deleted(&self, payload: &Value) -> Result<Value, DomainError>;
}

#[async_trait]
pub trait InventoryActions: Send + Sync {
    async fn adjusted(&self, payload: &Value) -> Result<Value, DomainError>;
    async fn restocked(&self, payload: &Value) -> Result<Value, DomainError>;
}

#[async_trait]
pub trait PaymentActions: Send + Sync {
    /// A payment provider notified a change for a payment.
    async fn notified(&self, payload: &Value) -> Result<Value, DomainError>;
}
