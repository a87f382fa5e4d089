//! Rental service: open request sessions and submitted requests

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::{sync::Mutex, time::Instant};
use utoipa::ToSchema;
use uuid::Uuid;

use super::submission::RentalSubmitter;
use crate::{
    error::{AppError, AppResult},
    models::{rental::RentalQuery, DraftPatch, NewRentalRequest, Photo, PhotoSlot, RentalRequest, RentalStatus},
    rental::{PhotoTicket, RentalWorkflow, SubmissionError, WorkflowLimits, WorkflowState, WorkflowView},
    repository::Repository,
};

/// An open rental request workflow as seen by the client
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalSession {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub view: WorkflowView,
}

/// Lifetime bounds for sessions held in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Sessions untouched for this long are dropped, submitted ones included
    pub idle_ttl: Duration,
    /// A submission still outstanding after this long is recorded as failed
    pub submit_timeout: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(30 * 60),
            submit_timeout: Duration::from_secs(30),
        }
    }
}

struct Session {
    workflow: RentalWorkflow,
    last_touched: Instant,
}

type SessionMap = Arc<Mutex<HashMap<Uuid, Session>>>;

#[derive(Clone)]
pub struct RentalsService {
    repository: Repository,
    submitter: Arc<dyn RentalSubmitter>,
    limits: WorkflowLimits,
    policy: SessionPolicy,
    sessions: SessionMap,
}

/// Abandons an outstanding photo read when the upload is dropped before
/// its payload reaches the workflow.
struct PhotoReadGuard {
    sessions: SessionMap,
    session_id: Uuid,
    ticket: Option<PhotoTicket>,
}

impl PhotoReadGuard {
    fn disarm(&mut self) {
        self.ticket = None;
    }
}

impl Drop for PhotoReadGuard {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let sessions = self.sessions.clone();
        let session_id = self.session_id;
        runtime.spawn(async move {
            if let Some(session) = sessions.lock().await.get_mut(&session_id) {
                session.workflow.abandon_photo_read(ticket);
                tracing::debug!(%session_id, slot = ?ticket.slot, "Interrupted photo upload abandoned");
            }
        });
    }
}

impl RentalsService {
    pub fn new(
        repository: Repository,
        submitter: Arc<dyn RentalSubmitter>,
        limits: WorkflowLimits,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            repository,
            submitter,
            limits,
            policy,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // ---------------------------------------------------------------------------
    // Sessions
    // ---------------------------------------------------------------------------

    /// Start a rental request for a piece of equipment
    pub async fn open_session(&self, equipment_id: i64) -> AppResult<RentalSession> {
        self.evict_idle().await;

        let equipment = self.repository.equipment.get_by_id(equipment_id).await?;
        let workflow = RentalWorkflow::open(equipment, self.limits)?;
        let session_id = Uuid::new_v4();
        let view = workflow.view();

        self.sessions.lock().await.insert(
            session_id,
            Session {
                workflow,
                last_touched: Instant::now(),
            },
        );
        tracing::debug!(%session_id, equipment_id, "Rental session opened");
        Ok(RentalSession { session_id, view })
    }

    /// Run `f` against the session's workflow and return the resulting snapshot
    async fn with_session<T>(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&mut RentalWorkflow) -> AppResult<T>,
    ) -> AppResult<RentalSession> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::NotFound(format!("Rental session {} not found", session_id)))?;
        session.last_touched = Instant::now();
        f(&mut session.workflow)?;
        Ok(RentalSession {
            session_id,
            view: session.workflow.view(),
        })
    }

    pub async fn get_session(&self, session_id: Uuid) -> AppResult<RentalSession> {
        self.with_session(session_id, |_| Ok(())).await
    }

    pub async fn update_draft(&self, session_id: Uuid, patch: DraftPatch) -> AppResult<RentalSession> {
        self.with_session(session_id, |wf| Ok(wf.apply_patch(patch)?)).await
    }

    pub async fn next(&self, session_id: Uuid) -> AppResult<RentalSession> {
        let result = self.with_session(session_id, |wf| Ok(wf.next()?)).await;
        match &result {
            Ok(session) => tracing::debug!(%session_id, step = ?session.view.step, "Rental step advanced"),
            Err(AppError::InvalidFields { step, errors }) => tracing::info!(
                %session_id,
                ?step,
                fields = errors.len(),
                "Rental step blocked by validation"
            ),
            Err(_) => {}
        }
        result
    }

    pub async fn back(&self, session_id: Uuid) -> AppResult<RentalSession> {
        self.with_session(session_id, |wf| Ok(wf.back()?)).await
    }

    /// Discard the session and its draft
    pub async fn cancel(&self, session_id: Uuid) -> AppResult<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::NotFound(format!("Rental session {} not found", session_id)))?;
        if !session.workflow.state().is_closed() {
            session.workflow.cancel()?;
        }
        sessions.remove(&session_id);
        tracing::debug!(%session_id, "Rental session discarded");
        Ok(())
    }

    /// Attach a verification photo. `read` yields the uploaded payload; the
    /// session stays usable while it is awaited, but cannot advance or submit.
    pub async fn attach_photo<F>(&self, session_id: Uuid, slot: PhotoSlot, read: F) -> AppResult<RentalSession>
    where
        F: Future<Output = AppResult<Photo>>,
    {
        let mut ticket = None;
        self.with_session(session_id, |wf| {
            ticket = Some(wf.begin_photo_read(slot)?);
            Ok(())
        })
        .await?;
        let ticket = ticket.ok_or_else(|| AppError::Internal("photo read was not started".to_string()))?;
        let mut guard = PhotoReadGuard {
            sessions: self.sessions.clone(),
            session_id,
            ticket: Some(ticket),
        };

        let outcome = read.await;

        self.with_session(session_id, |wf| {
            guard.disarm();
            match outcome {
                Ok(photo) => {
                    let size = photo.size();
                    wf.complete_photo_read(ticket, photo)?;
                    tracing::debug!(%session_id, ?slot, size, "Photo attached");
                    Ok(())
                }
                Err(e) => {
                    wf.abandon_photo_read(ticket);
                    Err(e)
                }
            }
        })
        .await
    }

    /// Submit the request. The submitter runs in its own task so the outcome
    /// is recorded even when the caller goes away, and is bounded by
    /// `submit_timeout`. The workflow rejects concurrent actions meanwhile.
    pub async fn submit(&self, session_id: Uuid) -> AppResult<RentalSession> {
        let mut request = None;
        self.with_session(session_id, |wf| {
            request = Some(wf.begin_submit(Utc::now())?);
            Ok(())
        })
        .await?;
        let request = request.ok_or_else(|| AppError::Internal("submission was not started".to_string()))?;

        let service = self.clone();
        tokio::spawn(async move { service.finish_submit(session_id, request).await })
            .await
            .map_err(|e| AppError::Internal(format!("Submission task failed: {}", e)))?
    }

    async fn finish_submit(&self, session_id: Uuid, request: NewRentalRequest) -> AppResult<RentalSession> {
        let equipment_id = request.equipment_id;
        let timeout = self.policy.submit_timeout;

        let outcome = match tokio::time::timeout(timeout, self.submitter.submit(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SubmissionError::Transport(format!(
                "no response within {} ms",
                timeout.as_millis()
            ))),
        };
        let failure = outcome.as_ref().err().cloned();

        let session = self
            .with_session(session_id, |wf| Ok(wf.complete_submit(outcome)?))
            .await?;

        match failure {
            Some(e) => {
                tracing::warn!(%session_id, equipment_id, "Rental submission failed: {}", e);
                Err(AppError::Submission(e))
            }
            None => {
                tracing::info!(%session_id, equipment_id, "Rental request submitted");
                Ok(session)
            }
        }
    }

    /// Drop sessions idle for longer than the policy allows. Sessions with a
    /// submission in flight are kept until it settles.
    pub async fn evict_idle(&self) -> usize {
        let ttl = self.policy.idle_ttl;
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            *session.workflow.state() == WorkflowState::Submitting || now.duration_since(session.last_touched) < ttl
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Idle rental sessions evicted");
        }
        evicted
    }

    /// Periodically evict idle sessions for the life of the process
    pub fn spawn_session_reaper(&self) {
        let service = self.clone();
        let period = (self.policy.idle_ttl / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                service.evict_idle().await;
            }
        });
    }

    pub async fn open_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    // ---------------------------------------------------------------------------
    // Submitted requests
    // ---------------------------------------------------------------------------

    pub async fn list_requests(&self, query: &RentalQuery) -> AppResult<Vec<RentalRequest>> {
        Ok(self.repository.rentals.list(query).await)
    }

    pub async fn get_request(&self, request_id: &str) -> AppResult<RentalRequest> {
        self.repository.rentals.get_by_id(request_id).await
    }

    /// Stored verification photo of a submitted request
    pub async fn get_request_photo(&self, request_id: &str, slot: PhotoSlot) -> AppResult<Photo> {
        let request = self.repository.rentals.get_by_id(request_id).await?;
        let photo_ref = request.photo(slot);
        self.repository
            .photos
            .get(&photo_ref.sha256)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Photo {} of rental request {} not found", slot, request_id)))
    }

    pub async fn stored_photos(&self) -> usize {
        self.repository.photos.count().await
    }

    pub async fn update_status(&self, request_id: &str, status: RentalStatus) -> AppResult<RentalRequest> {
        let request = self.repository.rentals.update_status(request_id, status).await?;
        tracing::info!(request_id, %status, "Rental request status changed");
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Receipt, RentalField},
        services::{
            equipment::EquipmentService,
            submission::{LocalSubmitter, MockRentalSubmitter},
        },
    };
    use async_trait::async_trait;

    /// Never answers
    struct StalledSubmitter;

    #[async_trait]
    impl RentalSubmitter for StalledSubmitter {
        async fn submit(&self, _request: NewRentalRequest) -> Result<Receipt, SubmissionError> {
            std::future::pending().await
        }
    }

    async fn service_in(
        repository: Repository,
        submitter: Arc<dyn RentalSubmitter>,
        policy: SessionPolicy,
    ) -> RentalsService {
        EquipmentService::new(repository.clone())
            .seed_sample_catalog()
            .await
            .unwrap();
        RentalsService::new(repository, submitter, WorkflowLimits::default(), policy)
    }

    async fn service(submitter: MockRentalSubmitter) -> RentalsService {
        service_in(Repository::new(), Arc::new(submitter), SessionPolicy::default()).await
    }

    fn jpeg() -> Photo {
        Photo::new("image/jpeg", vec![0xff, 0xd8, 0xff])
    }

    fn complete_patch() -> DraftPatch {
        DraftPatch {
            start_date: Some("2025-07-01".to_string()),
            end_date: Some("2025-07-03".to_string()),
            purpose: Some("Ploughing".to_string()),
            contact_name: Some("Sunita Devi".to_string()),
            contact_phone: Some("9876543210".to_string()),
            contact_email: Some("sunita@example.com".to_string()),
            id_number: Some("123412341234".to_string()),
            terms_accepted: Some(true),
            ..Default::default()
        }
    }

    async fn at_verification(service: &RentalsService) -> Uuid {
        let id = service.open_session(1).await.unwrap().session_id;
        service.update_draft(id, complete_patch()).await.unwrap();
        service.next(id).await.unwrap();
        service.next(id).await.unwrap();
        service.attach_photo(id, PhotoSlot::User, async { Ok(jpeg()) }).await.unwrap();
        service
            .attach_photo(id, PhotoSlot::EquipmentLocation, async { Ok(jpeg()) })
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_booked_equipment_cannot_be_requested() {
        let service = service(MockRentalSubmitter::new()).await;
        assert!(matches!(service.open_session(3).await, Err(AppError::BusinessRule(_))));
        assert!(matches!(service.open_session(99).await, Err(AppError::NotFound(_))));
        assert_eq!(service.open_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_step_reports_fields() {
        let service = service(MockRentalSubmitter::new()).await;
        let id = service.open_session(1).await.unwrap().session_id;

        match service.next(id).await {
            Err(AppError::InvalidFields { errors, .. }) => {
                assert!(errors.contains(RentalField::StartDate));
                assert!(errors.contains(RentalField::Purpose));
            }
            other => panic!("expected invalid fields, got {:?}", other.map(|s| s.view.step)),
        }
        let session = service.get_session(id).await.unwrap();
        assert_eq!(session.view.step, Some(1));
        assert_eq!(session.view.errors.len(), 3);
    }

    #[tokio::test]
    async fn test_submit_success() {
        let mut submitter = MockRentalSubmitter::new();
        submitter
            .expect_submit()
            .withf(|r| r.equipment_id == 1 && r.estimate.duration_days == 3)
            .times(1)
            .returning(|_| {
                Ok(Receipt {
                    request_id: "REQ-42".to_string(),
                    status: RentalStatus::Pending,
                })
            });
        let service = service(submitter).await;
        let id = at_verification(&service).await;

        let session = service.submit(id).await.unwrap();
        assert!(matches!(session.view.state, WorkflowState::Submitted { ref receipt } if receipt.request_id == "REQ-42"));
        assert!(matches!(service.submit(id).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_failed_submission_can_be_retried() {
        let mut submitter = MockRentalSubmitter::new();
        let mut seq = mockall::Sequence::new();
        submitter
            .expect_submit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(SubmissionError::Transport("connection refused".to_string())));
        submitter
            .expect_submit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(Receipt {
                    request_id: "REQ-7".to_string(),
                    status: RentalStatus::Pending,
                })
            });
        let service = service(submitter).await;
        let id = at_verification(&service).await;

        assert!(matches!(service.submit(id).await, Err(AppError::Submission(_))));
        let session = service.get_session(id).await.unwrap();
        assert!(matches!(session.view.state, WorkflowState::Failed { .. }));
        assert_eq!(session.view.step, Some(3));
        assert!(session.view.draft.user_photo.is_some());

        let session = service.submit(id).await.unwrap();
        assert!(matches!(session.view.state, WorkflowState::Submitted { .. }));
    }

    #[tokio::test]
    async fn test_failed_photo_read_is_abandoned() {
        let service = service(MockRentalSubmitter::new()).await;
        let id = service.open_session(1).await.unwrap().session_id;

        let result = service
            .attach_photo(id, PhotoSlot::User, async {
                Err(AppError::BadRequest("upload interrupted".to_string()))
            })
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let session = service.get_session(id).await.unwrap();
        assert!(!session.view.photo_upload_pending);
        assert!(session.view.draft.user_photo.is_none());
    }

    #[tokio::test]
    async fn test_cancel_discards_session() {
        let service = service(MockRentalSubmitter::new()).await;
        let id = service.open_session(4).await.unwrap().session_id;
        service.cancel(id).await.unwrap();
        assert!(matches!(service.get_session(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.cancel(id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_dropped_submit_still_settles() {
        let policy = SessionPolicy {
            submit_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let service = service_in(Repository::new(), Arc::new(StalledSubmitter), policy).await;
        let id = at_verification(&service).await;

        let abandoned = tokio::time::timeout(Duration::from_millis(10), service.submit(id)).await;
        assert!(abandoned.is_err());
        let session = service.get_session(id).await.unwrap();
        assert_eq!(session.view.state, WorkflowState::Submitting);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let session = service.get_session(id).await.unwrap();
        assert!(matches!(session.view.state, WorkflowState::Failed { .. }));
        service.cancel(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_stalled_submitter_times_out() {
        let policy = SessionPolicy {
            submit_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let service = service_in(Repository::new(), Arc::new(StalledSubmitter), policy).await;
        let id = at_verification(&service).await;

        match service.submit(id).await {
            Err(AppError::Submission(SubmissionError::Transport(message))) => {
                assert!(message.contains("no response"))
            }
            other => panic!("expected a transport failure, got {:?}", other.map(|s| s.view.state)),
        }
        let session = service.get_session(id).await.unwrap();
        assert!(matches!(session.view.state, WorkflowState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_dropped_photo_upload_is_abandoned() {
        let service = service(MockRentalSubmitter::new()).await;
        let id = service.open_session(1).await.unwrap().session_id;
        service.update_draft(id, complete_patch()).await.unwrap();

        let upload = service.attach_photo(id, PhotoSlot::User, std::future::pending::<AppResult<Photo>>());
        assert!(tokio::time::timeout(Duration::from_millis(20), upload).await.is_err());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let session = service.get_session(id).await.unwrap();
        assert!(!session.view.photo_upload_pending);
        let session = service.next(id).await.unwrap();
        assert_eq!(session.view.step, Some(2));
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let policy = SessionPolicy {
            idle_ttl: Duration::from_millis(50),
            ..Default::default()
        };
        let repository = Repository::new();
        let service = service_in(repository.clone(), Arc::new(LocalSubmitter::new(repository)), policy).await;
        let idle = service.open_session(1).await.unwrap().session_id;
        let submitted = at_verification(&service).await;
        service.submit(submitted).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        let fresh = service.open_session(4).await.unwrap().session_id;

        assert!(matches!(service.get_session(idle).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.get_session(submitted).await, Err(AppError::NotFound(_))));
        assert!(service.get_session(fresh).await.is_ok());
        assert_eq!(service.open_sessions().await, 1);
        assert_eq!(service.evict_idle().await, 0);
    }

    #[tokio::test]
    async fn test_request_photo_download() {
        let repository = Repository::new();
        let submitter = Arc::new(LocalSubmitter::new(repository.clone()));
        let service = service_in(repository, submitter, SessionPolicy::default()).await;
        let id = at_verification(&service).await;
        let session = service.submit(id).await.unwrap();
        let request_id = match session.view.state {
            WorkflowState::Submitted { receipt } => receipt.request_id,
            other => panic!("expected submitted, got {:?}", other),
        };

        let photo = service.get_request_photo(&request_id, PhotoSlot::User).await.unwrap();
        assert_eq!(photo.content_type, "image/jpeg");
        assert_eq!(photo, jpeg());
        assert_eq!(service.stored_photos().await, 1);
        assert!(matches!(
            service.get_request_photo("REQ-0", PhotoSlot::User).await,
            Err(AppError::NotFound(_))
        ));
    }
}
