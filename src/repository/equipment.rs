//! Equipment catalog store

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{Equipment, EquipmentQuery, EquipmentType},
};

#[derive(Clone, Default)]
pub struct EquipmentRepository {
    rows: Arc<RwLock<BTreeMap<i64, Equipment>>>,
    last_id: Arc<AtomicI64>,
}

impl EquipmentRepository {
    /// List equipment matching the search text and type filter
    pub async fn list(&self, query: &EquipmentQuery) -> Vec<Equipment> {
        let search = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let type_filter = match query.equipment_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(t) if t.eq_ignore_ascii_case("all") => None,
            // an unknown type matches nothing
            Some(t) => Some(EquipmentType::from_str(t).ok()),
        };

        let rows = self.rows.read().await;
        rows.values()
            .filter(|e| match &search {
                Some(needle) => [&e.name, &e.owner_name, &e.location]
                    .iter()
                    .any(|field| field.to_lowercase().contains(needle)),
                None => true,
            })
            .filter(|e| match type_filter {
                Some(wanted) => wanted == Some(e.equipment_type),
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Equipment> {
        self.rows
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Insert equipment under the next free ID and return the stored row
    pub async fn create(&self, mut equipment: Equipment) -> Equipment {
        let mut rows = self.rows.write().await;
        equipment.id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        rows.insert(equipment.id, equipment.clone());
        equipment
    }

    pub async fn count(&self) -> usize {
        self.rows.read().await.len()
    }
}
