//! Business logic services

pub mod equipment;
pub mod rentals;
pub mod submission;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::{AppConfig, SubmissionMode},
    error::{AppError, AppResult},
    rental::WorkflowLimits,
    repository::Repository,
};
use submission::{HttpSubmitter, LocalSubmitter, RentalSubmitter};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub equipment: equipment::EquipmentService,
    pub rentals: rentals::RentalsService,
}

impl Services {
    /// Create all services with the given repository, picking the submitter
    /// from configuration
    pub async fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let submitter: Arc<dyn RentalSubmitter> = match config.submission.mode {
            SubmissionMode::Local => Arc::new(LocalSubmitter::new(repository.clone())),
            SubmissionMode::Http => {
                let endpoint = config.submission.endpoint.as_deref().ok_or_else(|| {
                    AppError::Internal("submission.endpoint is required in http mode".to_string())
                })?;
                tracing::info!("Forwarding rental requests to {}", endpoint);
                Arc::new(HttpSubmitter::new(
                    endpoint,
                    Duration::from_secs(config.submission.timeout_secs),
                )?)
            }
        };
        Self::with_submitter(repository, config, submitter).await
    }

    /// Create all services around an explicit submitter
    pub async fn with_submitter(
        repository: Repository,
        config: &AppConfig,
        submitter: Arc<dyn RentalSubmitter>,
    ) -> AppResult<Self> {
        let equipment = equipment::EquipmentService::new(repository.clone());
        if config.rentals.seed_sample_catalog {
            equipment.seed_sample_catalog().await?;
        }
        let limits = WorkflowLimits {
            max_photo_bytes: config.rentals.max_photo_bytes,
        };
        let policy = rentals::SessionPolicy {
            idle_ttl: Duration::from_secs(config.rentals.session_ttl_secs),
            submit_timeout: Duration::from_secs(config.submission.timeout_secs),
        };
        Ok(Self {
            equipment,
            rentals: rentals::RentalsService::new(repository, submitter, limits, policy),
        })
    }
}
