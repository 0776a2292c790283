//! Persistence: save and load the obligation store snapshot to a file.
//! Enables recovery after restart: deals, orders, settlements, and ID
//! counters are restored.

use crate::store::StoreSnapshot;
use std::path::Path;

/// File-based persistence: one JSON file. Save after state changes; load on startup.
#[derive(Clone, Debug)]
pub struct FilePersistence {
    path: std::path::PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Save a snapshot to the file. Overwrites the existing file.
    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<(), String> {
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| e.to_string())?;
        std::fs::write(&self.path, json).map_err(|e| e.to_string())
    }

    /// Load the snapshot from the file. Returns None if the file does not exist.
    pub fn load(&self) -> Result<Option<StoreSnapshot>, String> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.to_string()),
        };
        let snapshot: StoreSnapshot = serde_json::from_str(&data).map_err(|e| e.to_string())?;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ClearingEngine;
    use crate::types::{ClientId, DealId, NewDeal, NewOrder};
    use rust_decimal::Decimal;

    #[test]
    fn save_load_round_trip() {
        let mut engine = ClearingEngine::new();
        engine
            .create_deal(NewDeal {
                deal_id: DealId(1),
                dealership_id: 10,
                manager_id: 20,
                client_id: ClientId(5),
            })
            .unwrap();
        engine
            .create_orders(
                ClientId(5),
                vec![NewOrder {
                    deal_id: DealId(1),
                    order_type_id: 1,
                    amount: Decimal::from(100),
                    bank_id: None,
                }],
            )
            .unwrap();

        let path = std::env::temp_dir().join(format!("clearing_state_{}.json", std::process::id()));
        let persistence = FilePersistence::new(&path);
        persistence.save(&engine.snapshot()).unwrap();

        let loaded = persistence.load().unwrap().expect("snapshot present");
        assert_eq!(loaded.deals.len(), 1);
        assert_eq!(loaded.orders.len(), 1);
        assert_eq!(loaded.next_order_id, 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_missing_file_is_none() {
        let persistence = FilePersistence::new("/nonexistent/clearing_state.json");
        assert!(persistence.load().unwrap().is_none());
    }
}
