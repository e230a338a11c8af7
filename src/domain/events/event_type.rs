//! Closed set of domain event types recorded in the event log.
//!
//! Every type carries two static lookups used downstream: the resource
//! tables it touches (for cache invalidation) and the row operation implied
//! by its name. Both are exhaustive matches, so a new variant does not
//! compile until it is mapped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::invalidation::Operation;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Resource tables known to the invalidation bus.
pub mod tables {
    pub const ORDERS: &str = "orders";
    pub const ORDER_ITEMS: &str = "order_items";
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "categories";
    pub const INVENTORY: &str = "inventory";
    pub const PAYMENTS: &str = "payments";
}

/// A dot-namespaced domain event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DomainEventType {
    OrderCreated,
    OrderUpdated,
    OrderStatusChanged,
    OrderDeleted,
    OrderItemAdded,
    OrderItemRemoved,
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    CategoryCreated,
    CategoryUpdated,
    CategoryDeleted,
    InventoryAdjusted,
    InventoryRestocked,
    PaymentNotified,
}

impl DomainEventType {
    /// Every event type, in declaration order.
    pub const ALL: [DomainEventType; 15] = [
        DomainEventType::OrderCreated,
        DomainEventType::OrderUpdated,
        DomainEventType::OrderStatusChanged,
        DomainEventType::OrderDeleted,
        DomainEventType::OrderItemAdded,
        DomainEventType::OrderItemRemoved,
        DomainEventType::ProductCreated,
        DomainEventType::ProductUpdated,
        DomainEventType::ProductDeleted,
        DomainEventType::CategoryCreated,
        DomainEventType::CategoryUpdated,
        DomainEventType::CategoryDeleted,
        DomainEventType::InventoryAdjusted,
        DomainEventType::InventoryRestocked,
        DomainEventType::PaymentNotified,
    ];

    /// Returns the wire name stored in the event log.
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainEventType::OrderCreated => "order.created",
            DomainEventType::OrderUpdated => "order.updated",
            DomainEventType::OrderStatusChanged => "order.status_changed",
            DomainEventType::OrderDeleted => "order.deleted",
            DomainEventType::OrderItemAdded => "order.item_added",
            DomainEventType::OrderItemRemoved => "order.item_removed",
            DomainEventType::ProductCreated => "product.created",
            DomainEventType::ProductUpdated => "product.updated",
            DomainEventType::ProductDeleted => "product.deleted",
            DomainEventType::CategoryCreated => "category.created",
            DomainEventType::CategoryUpdated => "category.updated",
            DomainEventType::CategoryDeleted => "category.deleted",
            DomainEventType::InventoryAdjusted => "inventory.adjusted",
            DomainEventType::InventoryRestocked => "inventory.restocked",
            DomainEventType::PaymentNotified => "payment.notified",
        }
    }

    /// Resource tables whose cached reads become stale when this event is processed.
    pub fn affected_tables(&self) -> &'static [&'static str] {
        use tables::*;
        match self {
            DomainEventType::OrderCreated
            | DomainEventType::OrderUpdated
            | DomainEventType::OrderStatusChanged => &[ORDERS],
            DomainEventType::OrderDeleted => &[ORDERS, ORDER_ITEMS],
            DomainEventType::OrderItemAdded | DomainEventType::OrderItemRemoved => {
                &[ORDERS, ORDER_ITEMS]
            }
            DomainEventType::ProductCreated | DomainEventType::ProductUpdated => &[PRODUCTS],
            DomainEventType::ProductDeleted => &[PRODUCTS, INVENTORY],
            DomainEventType::CategoryCreated | DomainEventType::CategoryUpdated => &[CATEGORIES],
            DomainEventType::CategoryDeleted => &[CATEGORIES, PRODUCTS],
            DomainEventType::InventoryAdjusted | DomainEventType::InventoryRestocked => {
                &[INVENTORY, PRODUCTS]
            }
            DomainEventType::PaymentNotified => &[PAYMENTS, ORDERS],
        }
    }

    /// Row operation implied by the event name.
    pub fn operation(&self) -> Operation {
        Operation::from_event_name(self.as_str())
    }
}

impl fmt::Display for DomainEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainEventType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DomainEventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::UnknownEventType, format!("Unknown event type: {}", s))
            })
    }
}

impl TryFrom<String> for DomainEventType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DomainEventType> for String {
    fn from(value: DomainEventType) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_type_parses_back_from_its_name() {
        for event_type in DomainEventType::ALL {
            assert_eq!(event_type.as_str().parse::<DomainEventType>().unwrap(), event_type);
        }
    }

    #[test]
    fn names_are_unique_and_dot_namespaced() {
        let names: HashSet<_> = DomainEventType::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(names.len(), DomainEventType::ALL.len());
        assert!(names.iter().all(|n| n.split('.').count() == 2));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "order.teleported".parse::<DomainEventType>().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownEventType);
    }

    #[test]
    fn every_type_touches_at_least_one_table() {
        for event_type in DomainEventType::ALL {
            assert!(!event_type.affected_tables().is_empty(), "{}", event_type);
        }
    }

    #[test]
    fn order_created_touches_orders_only() {
        assert_eq!(DomainEventType::OrderCreated.affected_tables(), &["orders"]);
        assert_eq!(
            DomainEventType::OrderItemAdded.affected_tables(),
            &["orders", "order_items"]
        );
    }

    #[test]
    fn operations_follow_event_names() {
        assert_eq!(DomainEventType::OrderCreated.operation(), Operation::Insert);
        assert_eq!(DomainEventType::OrderItemAdded.operation(), Operation::Insert);
        assert_eq!(DomainEventType::ProductDeleted.operation(), Operation::Delete);
        assert_eq!(DomainEventType::OrderItemRemoved.operation(), Operation::Delete);
        assert_eq!(DomainEventType::InventoryAdjusted.operation(), Operation::Update);
        assert_eq!(DomainEventType::PaymentNotified.operation(), Operation::Update);
    }

    #[test]
    fn serializes_as_wire_name() {
        let json = serde_json::to_string(&DomainEventType::OrderStatusChanged).unwrap();
        assert_eq!(json, "\"order.status_changed\"");

        let parsed: DomainEventType = serde_json::from_str("\"inventory.restocked\"").unwrap();
        assert_eq!(parsed, DomainEventType::InventoryRestocked);
    }
}
