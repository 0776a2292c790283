//! In-memory obligation store: deals, orders, and persisted settlements.
//!
//! The store holds no locks itself; the API layer wraps the whole engine in a
//! mutex, so each engine call (including the deal deletion cascade) runs as
//! one atomic section. [`MemoryStore::snapshot`] and [`MemoryStore::restore`]
//! support file persistence across restarts.

use crate::types::{
    ClientId, Deal, DealId, Order, OrderId, Settlement, SettlementId, SettlementStatus,
};
use std::collections::HashMap;

/// Serializable copy of the full store state.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StoreSnapshot {
    pub deals: Vec<Deal>,
    pub orders: Vec<Order>,
    pub settlements: Vec<Settlement>,
    pub next_order_id: u64,
    pub next_settlement_id: u64,
}

/// Obligation store backing the clearing engine.
#[derive(Debug)]
pub struct MemoryStore {
    deals: HashMap<DealId, Deal>,
    orders: HashMap<OrderId, Order>,
    settlements: HashMap<SettlementId, Settlement>,
    next_order_id: u64,
    next_settlement_id: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            deals: HashMap::new(),
            orders: HashMap::new(),
            settlements: HashMap::new(),
            next_order_id: 1,
            next_settlement_id: 1,
        }
    }

    pub fn contains_deal(&self, deal_id: DealId) -> bool {
        self.deals.contains_key(&deal_id)
    }

    pub fn insert_deal(&mut self, deal: Deal) {
        self.deals.insert(deal.deal_id, deal);
    }

    pub fn get_deal(&self, deal_id: DealId) -> Option<&Deal> {
        self.deals.get(&deal_id)
    }

    /// Removes the deal and cascade-deletes its orders and settlements.
    /// Returns `false` when the deal does not exist (nothing is touched).
    pub fn remove_deal(&mut self, deal_id: DealId) -> bool {
        if self.deals.remove(&deal_id).is_none() {
            return false;
        }
        self.orders.retain(|_, o| o.deal_id != deal_id);
        self.settlements.retain(|_, s| s.deal_id != Some(deal_id));
        true
    }

    /// Inserts an order, assigning the next order id. Returns the stored order.
    pub fn insert_order(&mut self, mut order: Order) -> Order {
        order.order_id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        self.orders.insert(order.order_id, order.clone());
        order
    }

    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// Replaces an existing order in place. Returns `false` if it is missing.
    pub fn replace_order(&mut self, order: Order) -> bool {
        if !self.orders.contains_key(&order.order_id) {
            return false;
        }
        self.orders.insert(order.order_id, order);
        true
    }

    /// All orders belonging to deals of the given client, newest first.
    pub fn orders_for_client(&self, client_id: ClientId) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|o| {
                self.deals
                    .get(&o.deal_id)
                    .map(|d| d.client_id == client_id)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        sort_newest_first(&mut orders);
        orders
    }

    /// All orders of one deal, newest first (ties broken by descending order
    /// id). The ordering matters downstream: the netting engine takes the
    /// emitted bank reference from the first order in this sequence that
    /// carries one.
    pub fn orders_for_deal(&self, deal_id: DealId) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|o| o.deal_id == deal_id)
            .cloned()
            .collect();
        sort_newest_first(&mut orders);
        orders
    }

    /// Persists a settlement, assigning the next settlement id.
    pub fn insert_settlement(&mut self, mut settlement: Settlement) -> Settlement {
        settlement.settlement_id = SettlementId(self.next_settlement_id);
        self.next_settlement_id += 1;
        self.settlements
            .insert(settlement.settlement_id, settlement.clone());
        settlement
    }

    pub fn get_settlement(&self, settlement_id: SettlementId) -> Option<&Settlement> {
        self.settlements.get(&settlement_id)
    }

    pub fn update_settlement_status(
        &mut self,
        settlement_id: SettlementId,
        status: SettlementStatus,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> Option<Settlement> {
        let settlement = self.settlements.get_mut(&settlement_id)?;
        settlement.status = status;
        settlement.updated_at = updated_at;
        Some(settlement.clone())
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let mut deals: Vec<Deal> = self.deals.values().cloned().collect();
        deals.sort_by_key(|d| d.deal_id.0);
        let mut orders: Vec<Order> = self.orders.values().cloned().collect();
        orders.sort_by_key(|o| o.order_id.0);
        let mut settlements: Vec<Settlement> = self.settlements.values().cloned().collect();
        settlements.sort_by_key(|s| s.settlement_id.0);
        StoreSnapshot {
            deals,
            orders,
            settlements,
            next_order_id: self.next_order_id,
            next_settlement_id: self.next_settlement_id,
        }
    }

    pub fn restore(snapshot: StoreSnapshot) -> Self {
        Self {
            deals: snapshot.deals.into_iter().map(|d| (d.deal_id, d)).collect(),
            orders: snapshot
                .orders
                .into_iter()
                .map(|o| (o.order_id, o))
                .collect(),
            settlements: snapshot
                .settlements
                .into_iter()
                .map(|s| (s.settlement_id, s))
                .collect(),
            next_order_id: snapshot.next_order_id,
            next_settlement_id: snapshot.next_settlement_id,
        }
    }
}

fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then(b.order_id.0.cmp(&a.order_id.0))
    });
}
