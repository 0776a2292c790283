//! Multilateral netting over a deal's orders.
//!
//! [`compute_net_settlements`] builds the obligation graph among the clearing
//! participants, reduces it to one net position per participant, and emits a
//! pending [`Settlement`] for every strictly nonzero position. Pure over its
//! input sequence apart from a single timestamp capture for the emitted
//! records; safe to run concurrently for different deals.
//!
//! Credit policy: a credit order posts Bank→Client — the bank disburses the
//! financed amount to the client; the client's debt to the bank and the
//! bank's settlement with the dealership both live outside the deal. A
//! credit order without a bank reference contributes nothing to the matrix.

use crate::error::ClearingError;
use crate::types::{DealId, Order, OrderType, Settlement, SettlementId, SettlementStatus};
use chrono::Utc;
use rust_decimal::Decimal;

/// Fixed clearing roles. Participants are identified by position in the
/// participant list (client 0, dealership 1, bank 2), not by a persistent id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Participant {
    Client,
    Dealership,
    Bank,
}

impl Participant {
    pub fn label(&self) -> &'static str {
        match self {
            Participant::Client => "Client",
            Participant::Dealership => "Dealership",
            Participant::Bank => "Bank",
        }
    }
}

const CLIENT: usize = 0;
const DEALERSHIP: usize = 1;
const BANK: usize = 2;

/// Builds the ordered participant list for a set of orders: client and
/// dealership always; the bank joins iff any order references one.
pub fn participants_for(orders: &[Order]) -> Vec<Participant> {
    let mut participants = vec![Participant::Client, Participant::Dealership];
    if orders.iter().any(|o| o.bank_id.is_some()) {
        participants.push(Participant::Bank);
    }
    participants
}

/// N×N table of gross obligations: cell `[debtor][creditor]` is the total the
/// debtor owes the creditor. Diagonal stays zero (no self-obligation).
#[derive(Clone, Debug, PartialEq)]
pub struct ObligationMatrix {
    n: usize,
    cells: Vec<Decimal>,
}

impl ObligationMatrix {
    /// Zero matrix for `n` participants.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            cells: vec![Decimal::ZERO; n * n],
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, debtor: usize, creditor: usize) -> Decimal {
        self.cells[debtor * self.n + creditor]
    }

    /// Accumulates an obligation of `amount` from `debtor` to `creditor`.
    pub fn post(&mut self, debtor: usize, creditor: usize, amount: Decimal) {
        debug_assert!(debtor != creditor, "no self-obligation");
        self.cells[debtor * self.n + creditor] += amount;
    }

    /// Net position per participant: outgoing minus incoming totals.
    /// `net[i] = Σ_j m[i][j] − Σ_j m[j][i]`. Positive means the participant
    /// owes; negative means the participant is owed. Sums to zero whenever
    /// every posted obligation stays inside the matrix.
    pub fn net_positions(&self) -> Vec<Decimal> {
        let mut net = vec![Decimal::ZERO; self.n];
        for i in 0..self.n {
            for j in 0..self.n {
                if i != j {
                    net[i] += self.get(i, j);
                    net[i] -= self.get(j, i);
                }
            }
        }
        net
    }
}

/// Builds the participant list and obligation matrix for a deal's orders.
///
/// Dispatches each order on its type:
/// - Purchase: Client→Dealership.
/// - Credit: Bank→Client; a credit order without a bank reference posts
///   nothing (the obligation is out of the deal's scope).
/// - Trade-in: Dealership→Client.
///
/// Any other type id fails the whole computation with
/// [`ClearingError::InvalidInput`]; there is no partial result.
pub fn build_obligation_matrix(
    orders: &[Order],
) -> Result<(Vec<Participant>, ObligationMatrix), ClearingError> {
    let participants = participants_for(orders);
    let mut matrix = ObligationMatrix::new(participants.len());

    for order in orders {
        let amount = order.amount;
        match OrderType::from_id(order.order_type_id) {
            Some(OrderType::Purchase) => matrix.post(CLIENT, DEALERSHIP, amount),
            Some(OrderType::Credit) => {
                if order.bank_id.is_some() {
                    matrix.post(BANK, CLIENT, amount);
                }
            }
            Some(OrderType::TradeIn) => matrix.post(DEALERSHIP, CLIENT, amount),
            None => {
                return Err(ClearingError::InvalidInput(format!(
                    "unknown order_type_id {}",
                    order.order_type_id
                )))
            }
        }
    }

    Ok((participants, matrix))
}

/// Reduces a deal's orders to net settlements, one per participant with a
/// strictly nonzero net position, in participant-list order.
///
/// Comparison to zero is exact (scaled decimal, no epsilon). The bank
/// participant's settlement carries the bank reference of the first order in
/// the input sequence that has one; multiple distinct bank references are not
/// validated against each other. Returns an empty vector when there are no
/// orders or every position nets out.
pub fn compute_net_settlements(
    deal_id: DealId,
    orders: &[Order],
) -> Result<Vec<Settlement>, ClearingError> {
    let (participants, matrix) = build_obligation_matrix(orders)?;
    let net = matrix.net_positions();

    let bank_ref = orders.iter().find_map(|o| o.bank_id);
    let now = Utc::now();

    let mut settlements = Vec::new();
    for (i, participant) in participants.iter().enumerate() {
        if net[i] != Decimal::ZERO {
            settlements.push(Settlement {
                settlement_id: SettlementId(0), // ephemeral, not persisted
                deal_id: Some(deal_id),
                amount: net[i],
                status: SettlementStatus::Pending,
                bank_id: match participant {
                    Participant::Bank => bank_ref,
                    _ => None,
                },
                created_at: now,
                updated_at: now,
            });
        }
    }
    Ok(settlements)
}
