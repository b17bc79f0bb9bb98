use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use crate::catalog::SubsidyCatalog;
use crate::wizard::repository::{RepositoryError, SessionRepository};
use crate::wizard::scoring::Answer;
use crate::wizard::service::WizardService;
use crate::wizard::session::{SessionId, WizardSession};
use crate::wizard::wizard_router;

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    sessions: Arc<Mutex<HashMap<SessionId, WizardSession>>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, session: WizardSession) -> Result<WizardSession, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.contains_key(&session.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn update(&self, session: WizardSession) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.contains_key(&session.id) {
            guard.insert(session.id.clone(), session);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<WizardSession>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _session: WizardSession) -> Result<WizardSession, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn update(&self, _session: WizardSession) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<WizardSession>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }
}

pub(super) fn build_service() -> (Arc<WizardService<MemoryRepository>>, MemoryRepository) {
    let repository = MemoryRepository::default();
    let service = WizardService::new(
        Arc::new(SubsidyCatalog::standard()),
        Arc::new(repository.clone()),
    )
    .expect("standard catalog is valid");
    (Arc::new(service), repository)
}

/// Answers that rank 小規模事業者持続化補助金 first.
pub(super) fn shop_owner_answers() -> Vec<Answer> {
    vec![
        Answer::new("business_type", "food"),
        Answer::new("employee_count", "micro"),
        Answer::new("investment_purpose", "sales_channel"),
        Answer::new("budget", "under_500k"),
        Answer::new("digital_maturity", "paper_based"),
    ]
}

pub(super) fn router_with_service(service: Arc<WizardService<MemoryRepository>>) -> axum::Router {
    wizard_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("valid json")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status code");
}
