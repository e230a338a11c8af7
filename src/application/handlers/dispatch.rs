//! EventDispatcher - logs a domain action, runs its handler, records the outcome.
//!
//! Every dispatch writes exactly one event log row:
//!
//! 1. Append a `pending` row
//! 2. Route the payload to the registered handler for its type
//! 3. Mark the row `processed` and return the handler's result, or mark it
//!    `failed` and return the handler's error unchanged
//!
//! Routing is an exhaustive `match` over `DomainEventType`, so an event type
//! without a handler does not compile.

use serde_json::Value;
use std::sync::Arc;

use crate::domain::events::DomainEventType;
use crate::domain::foundation::DomainError;
use crate::ports::{CatalogActions, EventLog, InventoryActions, OrderActions, PaymentActions};

/// The host's domain action handlers, one per resource family.
#[derive(Clone)]
pub struct HandlerRegistry {
    orders: Arc<dyn OrderActions>,
    catalog: Arc<dyn CatalogActions>,
    inventory: Arc<dyn InventoryActions>,
    payments: Arc<dyn PaymentActions>,
}

impl HandlerRegistry {
    pub fn new(
        orders: Arc<dyn OrderActions>,
        catalog: Arc<dyn CatalogActions>,
        inventory: Arc<dyn InventoryActions>,
        payments: Arc<dyn PaymentActions>,
    ) -> Self {
        Self {
            orders,
            catalog,
            inventory,
            payments,
        }
    }

    /// Invokes the handler for `event_type`.
    pub async fn handle(
        &self,
        event_type: DomainEventType,
        payload: &Value,
    ) -> Result<Value, DomainError> {
        use DomainEventType::*;
        match event_type {
            OrderCreated => self.orders.created(payload).await,
            OrderUpdated => self.orders.updated(payload).await,
            OrderStatusChanged => self.orders.status_changed(payload).await,
            OrderDeleted => self.orders.deleted(payload).await,
            OrderItemAdded => self.orders.item_added(payload).await,
            OrderItemRemoved => self.orders.item_removed(payload).await,
            ProductCreated => self.catalog.product_created(payload).await,
            ProductUpdated => self.catalog.product_updated(payload).await,
            ProductDeleted => self.catalog.product_deleted(payload).await,
            CategoryCreated => self.catalog.category_created(payload).await,
            CategoryUpdated => self.catalog.category_updated(payload).await,
            CategoryDeleted => self.catalog.category_deleted(payload).await,
            InventoryAdjusted => self.inventory.adjusted(payload).await,
            InventoryRestocked => self.inventory.restocked(payload).await,
            PaymentNotified => self.payments.notified(payload).await,
        }
    }
}

pub struct EventDispatcher {
    log: Arc<dyn EventLog>,
    registry: HandlerRegistry,
}

impl EventDispatcher {
    pub fn new(log: Arc<dyn EventLog>, registry: HandlerRegistry) -> Self {
        Self { log, registry }
    }

    /// Logs and handles one domain action.
    ///
    /// Handler errors are returned as-is after the row is marked `failed`.
    /// A failure to record the terminal status is logged, not returned, so
    /// the caller always sees the handler's own outcome.
    #[tracing::instrument(skip_all, fields(event_type = %event_type))]
    pub async fn dispatch(
        &self,
        event_type: DomainEventType,
        payload: Value,
    ) -> Result<Value, DomainError> {
        let event_id = self.log.append(event_type.as_str(), &payload).await?;

        match self.registry.handle(event_type, &payload).await {
            Ok(result) => {
                if let Err(e) = self.log.mark_processed(event_id).await {
                    tracing::warn!(event_id, error = %e, "Failed to mark event processed");
                }
                Ok(result)
            }
            Err(err) => {
                tracing::error!(event_id, error = %err, "Domain event handler failed");
                if let Err(e) = self.log.mark_failed(event_id, &err.to_string()).await {
                    tracing::warn!(event_id, error = %e, "Failed to mark event failed");
                }
                Err(err)
            }
        }
    }

    /// Parses a wire event type name, then dispatches.
    ///
    /// Unknown names are rejected before anything is logged.
    pub async fn dispatch_named(
        &self,
        event_type: &str,
        payload: Value,
    ) -> Result<Value, DomainError> {
        let event_type: DomainEventType = event_type.parse()?;
        self.dispatch(event_type, payload).await
    }
}
