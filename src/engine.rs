//! Single-entry clearing engine facade.
//!
//! Holds the obligation store and applies input validation so the protocol
//! layer can call one method per operation. The netting computation itself
//! lives in [`crate::netting`]; [`ClearingEngine::settlements_for_deal`]
//! fetches the deal's orders and hands them to it.

use crate::error::ClearingError;
use crate::netting::compute_net_settlements;
use crate::store::{MemoryStore, StoreSnapshot};
use crate::types::{
    ClientId, Deal, DealId, NewDeal, NewOrder, NewSettlement, Order, OrderId, OrderStatus,
    Settlement, SettlementId, SettlementStatus,
};
use chrono::Utc;
use log::info;

/// Business-logic facade over the obligation store and the netting engine.
#[derive(Debug)]
pub struct ClearingEngine {
    store: MemoryStore,
}

impl Default for ClearingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ClearingEngine {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
        }
    }

    /// Rebuilds an engine from a persisted snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            store: MemoryStore::restore(snapshot),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    /// Creates a deal. The deal id is caller-assigned and must be unused.
    pub fn create_deal(&mut self, req: NewDeal) -> Result<Deal, ClearingError> {
        if req.deal_id.0 == 0 {
            return Err(ClearingError::InvalidInput("invalid deal_id".into()));
        }
        if req.dealership_id == 0 {
            return Err(ClearingError::InvalidInput("invalid dealership_id".into()));
        }
        if req.manager_id == 0 {
            return Err(ClearingError::InvalidInput("invalid manager_id".into()));
        }
        if req.client_id.0 == 0 {
            return Err(ClearingError::InvalidInput("invalid client_id".into()));
        }
        if self.store.contains_deal(req.deal_id) {
            return Err(ClearingError::InvalidInput(format!(
                "deal {} already exists",
                req.deal_id.0
            )));
        }

        let now = Utc::now();
        let deal = Deal {
            deal_id: req.deal_id,
            dealership_id: req.dealership_id,
            manager_id: req.manager_id,
            client_id: req.client_id,
            is_completed: false,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_deal(deal.clone());
        info!(
            "deal created deal_id={} client_id={} dealership_id={}",
            deal.deal_id.0, deal.client_id.0, deal.dealership_id
        );
        Ok(deal)
    }

    /// Deletes a deal together with its orders and settlements.
    pub fn delete_deal(&mut self, deal_id: DealId) -> Result<(), ClearingError> {
        if !self.store.remove_deal(deal_id) {
            return Err(ClearingError::NotFound(format!(
                "deal {} not found",
                deal_id.0
            )));
        }
        info!("deal deleted deal_id={} (orders and settlements cascaded)", deal_id.0);
        Ok(())
    }

    /// Lists all orders across the client's deals, newest first, with total.
    pub fn list_orders(&self, client_id: ClientId) -> Result<(Vec<Order>, usize), ClearingError> {
        if client_id.0 == 0 {
            return Err(ClearingError::InvalidInput("invalid client_id".into()));
        }
        let orders = self.store.orders_for_client(client_id);
        let total = orders.len();
        Ok((orders, total))
    }

    /// Creates a batch of orders for the client. Every order in the batch is
    /// validated before any insert, so a bad entry leaves nothing behind.
    pub fn create_orders(
        &mut self,
        client_id: ClientId,
        reqs: Vec<NewOrder>,
    ) -> Result<Vec<Order>, ClearingError> {
        if client_id.0 == 0 {
            return Err(ClearingError::InvalidInput("invalid client_id".into()));
        }
        for req in &reqs {
            self.validate_order(req)?;
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(reqs.len());
        for req in reqs {
            let order = self.store.insert_order(Order {
                order_id: OrderId(0),
                deal_id: req.deal_id,
                order_type_id: req.order_type_id,
                amount: req.amount,
                status: OrderStatus::Pending,
                bank_id: req.bank_id,
                created_at: now,
                updated_at: now,
            });
            info!(
                "order submitted order_id={} deal_id={} order_type_id={} amount={}",
                order.order_id.0, order.deal_id.0, order.order_type_id, order.amount
            );
            created.push(order);
        }
        Ok(created)
    }

    /// Replaces the mutable fields of an existing order.
    pub fn update_order(
        &mut self,
        client_id: ClientId,
        order_id: OrderId,
        req: NewOrder,
    ) -> Result<Order, ClearingError> {
        if client_id.0 == 0 {
            return Err(ClearingError::InvalidInput("invalid client_id".into()));
        }
        let existing = self
            .store
            .get_order(order_id)
            .cloned()
            .ok_or_else(|| ClearingError::NotFound(format!("order {} not found", order_id.0)))?;
        self.validate_order(&req)?;

        let updated = Order {
            order_id: existing.order_id,
            deal_id: req.deal_id,
            order_type_id: req.order_type_id,
            amount: req.amount,
            status: existing.status,
            bank_id: req.bank_id,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };
        if !self.store.replace_order(updated.clone()) {
            return Err(ClearingError::NotFound(format!(
                "order {} not found",
                order_id.0
            )));
        }
        info!(
            "order updated order_id={} deal_id={} order_type_id={} amount={}",
            updated.order_id.0, updated.deal_id.0, updated.order_type_id, updated.amount
        );
        Ok(updated)
    }

    /// Orders of one deal in the store's documented ordering (newest first).
    /// This is the obligation-store boundary the netting engine consumes.
    pub fn orders_for_deal(&self, deal_id: DealId) -> Vec<Order> {
        self.store.orders_for_deal(deal_id)
    }

    /// Runs the netting computation over the deal's current orders and
    /// returns the ephemeral settlements. Nothing is persisted.
    pub fn settlements_for_deal(
        &self,
        deal_id: DealId,
    ) -> Result<Vec<Settlement>, ClearingError> {
        if deal_id.0 == 0 {
            return Err(ClearingError::InvalidInput("invalid deal_id".into()));
        }
        let orders = self.store.orders_for_deal(deal_id);
        let settlements = compute_net_settlements(deal_id, &orders)?;
        info!(
            "netting run deal_id={} orders={} settlements={}",
            deal_id.0,
            orders.len(),
            settlements.len()
        );
        Ok(settlements)
    }

    /// Persists a settlement with pending status and its own lifecycle,
    /// independent of the on-demand netting path.
    pub fn create_settlement(
        &mut self,
        req: NewSettlement,
    ) -> Result<Settlement, ClearingError> {
        if req.amount <= rust_decimal::Decimal::ZERO {
            return Err(ClearingError::InvalidInput(
                "amount must be positive".into(),
            ));
        }
        if let Some(deal_id) = req.deal_id {
            if !self.store.contains_deal(deal_id) {
                return Err(ClearingError::NotFound(format!(
                    "deal {} not found",
                    deal_id.0
                )));
            }
        }
        if let Some(bank_id) = req.bank_id {
            if bank_id.0 == 0 {
                return Err(ClearingError::InvalidInput("invalid bank_id".into()));
            }
        }

        let now = Utc::now();
        let settlement = self.store.insert_settlement(Settlement {
            settlement_id: SettlementId(0),
            deal_id: req.deal_id,
            amount: req.amount,
            status: SettlementStatus::Pending,
            bank_id: req.bank_id,
            created_at: now,
            updated_at: now,
        });
        info!(
            "settlement created settlement_id={} amount={}",
            settlement.settlement_id.0, settlement.amount
        );
        Ok(settlement)
    }

    /// Transitions a persisted settlement's status. Only pending settlements
    /// may move, and only to executed or cancelled.
    pub fn set_settlement_status(
        &mut self,
        settlement_id: SettlementId,
        status: SettlementStatus,
    ) -> Result<Settlement, ClearingError> {
        let current = self
            .store
            .get_settlement(settlement_id)
            .ok_or_else(|| {
                ClearingError::NotFound(format!("settlement {} not found", settlement_id.0))
            })?
            .status;

        if status == SettlementStatus::Pending {
            return Err(ClearingError::InvalidInput(
                "settlements cannot return to pending".into(),
            ));
        }
        if current != SettlementStatus::Pending {
            return Err(ClearingError::InvalidInput(format!(
                "settlement {} is not pending",
                settlement_id.0
            )));
        }

        let updated = self
            .store
            .update_settlement_status(settlement_id, status, Utc::now())
            .ok_or_else(|| {
                ClearingError::NotFound(format!("settlement {} not found", settlement_id.0))
            })?;
        info!(
            "settlement status changed settlement_id={} status={:?}",
            settlement_id.0, status
        );
        Ok(updated)
    }

    fn validate_order(&self, req: &NewOrder) -> Result<(), ClearingError> {
        if req.amount <= rust_decimal::Decimal::ZERO {
            return Err(ClearingError::InvalidInput(
                "amount must be positive".into(),
            ));
        }
        if req.deal_id.0 == 0 {
            return Err(ClearingError::InvalidInput("invalid deal_id".into()));
        }
        if req.order_type_id == 0 {
            return Err(ClearingError::InvalidInput("invalid order_type_id".into()));
        }
        if let Some(bank_id) = req.bank_id {
            if bank_id.0 == 0 {
                return Err(ClearingError::InvalidInput("invalid bank_id".into()));
            }
        }
        if !self.store.contains_deal(req.deal_id) {
            return Err(ClearingError::NotFound(format!(
                "deal {} not found",
                req.deal_id.0
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BankId;
    use rust_decimal::Decimal;

    fn init_log() {
        let _ = env_logger::try_init();
    }

    fn new_deal(deal_id: u64, client_id: u64) -> NewDeal {
        NewDeal {
            deal_id: DealId(deal_id),
            dealership_id: 10,
            manager_id: 20,
            client_id: ClientId(client_id),
        }
    }

    fn new_order(deal_id: u64, type_id: u32, amount: i64, bank_id: Option<u64>) -> NewOrder {
        NewOrder {
            deal_id: DealId(deal_id),
            order_type_id: type_id,
            amount: Decimal::from(amount),
            bank_id: bank_id.map(BankId),
        }
    }

    #[test]
    fn create_deal_then_orders_then_settlements() {
        init_log();
        let mut engine = ClearingEngine::new();
        engine.create_deal(new_deal(1, 5)).unwrap();
        engine
            .create_orders(
                ClientId(5),
                vec![new_order(1, 1, 100, None), new_order(1, 3, 30, None)],
            )
            .unwrap();

        let settlements = engine.settlements_for_deal(DealId(1)).unwrap();
        assert_eq!(settlements.len(), 2);
        assert_eq!(settlements[0].amount, Decimal::from(70));
        assert_eq!(settlements[1].amount, Decimal::from(-70));
    }

    #[test]
    fn create_deal_rejects_zero_ids_and_duplicates() {
        init_log();
        let mut engine = ClearingEngine::new();
        assert!(engine.create_deal(new_deal(0, 5)).is_err());
        let mut bad = new_deal(1, 5);
        bad.manager_id = 0;
        assert!(engine.create_deal(bad).is_err());

        engine.create_deal(new_deal(1, 5)).unwrap();
        let err = engine.create_deal(new_deal(1, 6)).unwrap_err();
        assert!(matches!(err, ClearingError::InvalidInput(_)));
    }

    #[test]
    fn delete_deal_cascades_and_reports_missing() {
        init_log();
        let mut engine = ClearingEngine::new();
        engine.create_deal(new_deal(1, 5)).unwrap();
        engine
            .create_orders(ClientId(5), vec![new_order(1, 1, 100, None)])
            .unwrap();
        engine.delete_deal(DealId(1)).unwrap();
        assert!(engine.orders_for_deal(DealId(1)).is_empty());
        assert!(matches!(
            engine.delete_deal(DealId(1)),
            Err(ClearingError::NotFound(_))
        ));
    }

    #[test]
    fn create_orders_whole_batch_validated_before_insert() {
        init_log();
        let mut engine = ClearingEngine::new();
        engine.create_deal(new_deal(1, 5)).unwrap();
        let err = engine
            .create_orders(
                ClientId(5),
                vec![new_order(1, 1, 100, None), new_order(1, 1, -5, None)],
            )
            .unwrap_err();
        assert!(matches!(err, ClearingError::InvalidInput(_)));
        let (orders, total) = engine.list_orders(ClientId(5)).unwrap();
        assert!(orders.is_empty(), "bad batch leaves nothing behind");
        assert_eq!(total, 0);
    }

    #[test]
    fn create_orders_rejects_missing_deal() {
        init_log();
        let mut engine = ClearingEngine::new();
        let err = engine
            .create_orders(ClientId(5), vec![new_order(99, 1, 100, None)])
            .unwrap_err();
        assert!(matches!(err, ClearingError::NotFound(_)));
    }

    #[test]
    fn update_order_replaces_fields_and_bumps_updated_at() {
        init_log();
        let mut engine = ClearingEngine::new();
        engine.create_deal(new_deal(1, 5)).unwrap();
        let created = engine
            .create_orders(ClientId(5), vec![new_order(1, 1, 100, None)])
            .unwrap();
        let updated = engine
            .update_order(ClientId(5), created[0].order_id, new_order(1, 3, 80, None))
            .unwrap();
        assert_eq!(updated.order_type_id, 3);
        assert_eq!(updated.amount, Decimal::from(80));
        assert_eq!(updated.created_at, created[0].created_at);
        assert!(updated.updated_at >= created[0].updated_at);
    }

    #[test]
    fn update_missing_order_is_not_found() {
        init_log();
        let mut engine = ClearingEngine::new();
        engine.create_deal(new_deal(1, 5)).unwrap();
        let err = engine
            .update_order(ClientId(5), OrderId(42), new_order(1, 1, 10, None))
            .unwrap_err();
        assert!(matches!(err, ClearingError::NotFound(_)));
    }

    #[test]
    fn settlements_propagate_unknown_type_error() {
        init_log();
        let mut engine = ClearingEngine::new();
        engine.create_deal(new_deal(1, 5)).unwrap();
        engine
            .create_orders(
                ClientId(5),
                vec![new_order(1, 1, 100, None), new_order(1, 9, 50, None)],
            )
            .unwrap();
        let err = engine.settlements_for_deal(DealId(1)).unwrap_err();
        match err {
            ClearingError::InvalidInput(msg) => assert!(msg.contains("order_type_id")),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn settlement_lifecycle_pending_to_executed_once() {
        init_log();
        let mut engine = ClearingEngine::new();
        engine.create_deal(new_deal(1, 5)).unwrap();
        let settlement = engine
            .create_settlement(NewSettlement {
                deal_id: Some(DealId(1)),
                amount: Decimal::from(70),
                bank_id: None,
            })
            .unwrap();
        assert_eq!(settlement.status, SettlementStatus::Pending);

        let executed = engine
            .set_settlement_status(settlement.settlement_id, SettlementStatus::Executed)
            .unwrap();
        assert_eq!(executed.status, SettlementStatus::Executed);

        let err = engine
            .set_settlement_status(settlement.settlement_id, SettlementStatus::Cancelled)
            .unwrap_err();
        assert!(matches!(err, ClearingError::InvalidInput(_)));
    }

    #[test]
    fn settlement_create_validates_amount_and_deal() {
        init_log();
        let mut engine = ClearingEngine::new();
        let err = engine
            .create_settlement(NewSettlement {
                deal_id: None,
                amount: Decimal::ZERO,
                bank_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, ClearingError::InvalidInput(_)));

        let err = engine
            .create_settlement(NewSettlement {
                deal_id: Some(DealId(9)),
                amount: Decimal::from(10),
                bank_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, ClearingError::NotFound(_)));
    }

    #[test]
    fn snapshot_round_trip_restores_state() {
        init_log();
        let mut engine = ClearingEngine::new();
        engine.create_deal(new_deal(1, 5)).unwrap();
        engine
            .create_orders(ClientId(5), vec![new_order(1, 1, 100, None)])
            .unwrap();
        let snapshot = engine.snapshot();
        let restored = ClearingEngine::from_snapshot(snapshot);
        let (orders, total) = restored.list_orders(ClientId(5)).unwrap();
        assert_eq!(total, 1);
        assert_eq!(orders[0].amount, Decimal::from(100));
    }
}
