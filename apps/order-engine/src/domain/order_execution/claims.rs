//! Order Claims
//!
//! Process-local exclusive ownership of an order for the duration of a
//! multi-step mutation (submit, local cancel, resize, delete). A claim is
//! released when its guard drops, on every exit path.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::shared::OrderId;

/// Set of orders currently owned by an in-progress mutation.
#[derive(Debug, Clone, Default)]
pub struct OrderClaims {
    held: Arc<Mutex<HashSet<OrderId>>>,
}

impl OrderClaims {
    /// Empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the order, or `None` if another mutation already holds it.
    #[must_use]
    pub fn try_claim(&self, id: OrderId) -> Option<OrderClaim> {
        if self.held.lock().insert(id) {
            Some(OrderClaim {
                id,
                held: Arc::clone(&self.held),
            })
        } else {
            None
        }
    }

    /// Whether a mutation currently holds the order.
    #[must_use]
    pub fn is_claimed(&self, id: OrderId) -> bool {
        self.held.lock().contains(&id)
    }
}

/// Guard for a claimed order.
#[derive(Debug)]
#[must_use = "the claim is released as soon as the guard drops"]
pub struct OrderClaim {
    id: OrderId,
    held: Arc<Mutex<HashSet<OrderId>>>,
}

impl OrderClaim {
    /// The claimed order.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.id
    }
}

impl Drop for OrderClaim {
    fn drop(&mut self) {
        self.held.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_refused_until_release() {
        let claims = OrderClaims::new();
        let id = OrderId::new(7);

        let first = claims.try_claim(id).unwrap();
        assert_eq!(first.order_id(), id);
        assert!(claims.try_claim(id).is_none());
        assert!(claims.is_claimed(id));

        drop(first);
        assert!(!claims.is_claimed(id));
        assert!(claims.try_claim(id).is_some());
    }

    #[test]
    fn claims_are_per_order() {
        let claims = OrderClaims::new();
        let _a = claims.try_claim(OrderId::new(1)).unwrap();
        assert!(claims.try_claim(OrderId::new(2)).is_some());
    }

    #[test]
    fn clones_share_the_same_set() {
        let claims = OrderClaims::new();
        let other = claims.clone();
        let _held = claims.try_claim(OrderId::new(3)).unwrap();
        assert!(other.try_claim(OrderId::new(3)).is_none());
    }
}
