//! Rental request store

use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{rental::RentalQuery, RentalRequest, RentalStatus},
};

#[derive(Clone, Default)]
pub struct RentalsRepository {
    rows: Arc<RwLock<IndexMap<String, RentalRequest>>>,
}

impl RentalsRepository {
    pub async fn create(&self, request: RentalRequest) -> AppResult<RentalRequest> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&request.request_id) {
            return Err(AppError::Conflict(format!(
                "Rental request {} already exists",
                request.request_id
            )));
        }
        rows.insert(request.request_id.clone(), request.clone());
        Ok(request)
    }

    pub async fn get_by_id(&self, request_id: &str) -> AppResult<RentalRequest> {
        self.rows
            .read()
            .await
            .get(request_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Rental request {} not found", request_id)))
    }

    /// List requests, oldest first
    pub async fn list(&self, query: &RentalQuery) -> Vec<RentalRequest> {
        self.rows
            .read()
            .await
            .values()
            .filter(|r| query.equipment_id.map_or(true, |id| r.equipment_id == id))
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .cloned()
            .collect()
    }

    /// Move a request along its lifecycle
    pub async fn update_status(&self, request_id: &str, status: RentalStatus) -> AppResult<RentalRequest> {
        let mut rows = self.rows.write().await;
        let request = rows
            .get_mut(request_id)
            .ok_or_else(|| AppError::NotFound(format!("Rental request {} not found", request_id)))?;

        if !request.status.can_transition_to(status) {
            return Err(AppError::Conflict(format!(
                "Rental request {} cannot go from {} to {}",
                request_id, request.status, status
            )));
        }
        request.status = status;
        request.updated_at = Utc::now();
        Ok(request.clone())
    }
}
