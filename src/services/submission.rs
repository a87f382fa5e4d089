//! Rental request submission: the hand-off of a finalized request to the
//! system that owns it from then on.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{Contact, DeliveryOption, Identity, NewRentalRequest, Photo, Receipt, RentalPeriod, RentalRequest},
    rental::{CostEstimate, SubmissionError},
    repository::Repository,
};

/// Accepts finalized rental requests. Implementations never retry; a failure
/// goes back to the user who may submit again.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RentalSubmitter: Send + Sync {
    async fn submit(&self, request: NewRentalRequest) -> Result<Receipt, SubmissionError>;
}

/// Stores requests and photos in the local repository
pub struct LocalSubmitter {
    repository: Repository,
    ids: snowflaked::sync::Generator,
}

impl LocalSubmitter {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            ids: snowflaked::sync::Generator::new(0),
        }
    }

    fn next_request_id(&self) -> String {
        format!("REQ-{}", self.ids.generate::<u64>())
    }
}

#[async_trait]
impl RentalSubmitter for LocalSubmitter {
    async fn submit(&self, request: NewRentalRequest) -> Result<Receipt, SubmissionError> {
        self.repository.photos.store(&request.user_photo).await;
        self.repository.photos.store(&request.equipment_location_photo).await;

        let record = RentalRequest::from_new(self.next_request_id(), &request);
        let stored = self
            .repository
            .rentals
            .create(record)
            .await
            .map_err(|e| SubmissionError::Rejected {
                status: 409,
                message: e.to_string(),
            })?;

        tracing::info!(
            request_id = %stored.request_id,
            equipment_id = stored.equipment_id,
            "Rental request stored"
        );
        Ok(stored.receipt())
    }
}

/// Forwards requests as JSON to an external rental service
pub struct HttpSubmitter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSubmitter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EncodedPhoto<'a> {
    content_type: &'a str,
    /// Base64 (standard alphabet, padded)
    data: String,
}

impl<'a> From<&'a Photo> for EncodedPhoto<'a> {
    fn from(photo: &'a Photo) -> Self {
        Self {
            content_type: &photo.content_type,
            data: STANDARD.encode(&photo.bytes),
        }
    }
}

/// Wire form of a request sent to the external service
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionPayload<'a> {
    equipment_id: i64,
    equipment_name: &'a str,
    rental_period: RentalPeriod,
    purpose: &'a str,
    delivery_option: DeliveryOption,
    delivery_address: Option<&'a str>,
    contact: &'a Contact,
    identity: &'a Identity,
    additional_notes: Option<&'a str>,
    user_photo: EncodedPhoto<'a>,
    equipment_location_photo: EncodedPhoto<'a>,
    terms_accepted: bool,
    estimate: &'a CostEstimate,
    submitted_at: DateTime<Utc>,
}

impl<'a> From<&'a NewRentalRequest> for SubmissionPayload<'a> {
    fn from(r: &'a NewRentalRequest) -> Self {
        Self {
            equipment_id: r.equipment_id,
            equipment_name: &r.equipment_name,
            rental_period: r.rental_period,
            purpose: &r.purpose,
            delivery_option: r.delivery_option,
            delivery_address: r.delivery_address.as_deref(),
            contact: &r.contact,
            identity: &r.identity,
            additional_notes: r.additional_notes.as_deref(),
            user_photo: EncodedPhoto::from(&r.user_photo),
            equipment_location_photo: EncodedPhoto::from(&r.equipment_location_photo),
            terms_accepted: r.terms_accepted,
            estimate: &r.estimate,
            submitted_at: r.submitted_at,
        }
    }
}

#[async_trait]
impl RentalSubmitter for HttpSubmitter {
    async fn submit(&self, request: NewRentalRequest) -> Result<Receipt, SubmissionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SubmissionPayload::from(&request))
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Receipt>()
            .await
            .map_err(|e| SubmissionError::Transport(format!("invalid receipt: {}", e)))
    }
}
