//! Student dashboard: browse events and register with the locally stored identity.

use std::{collections::HashSet, sync::Arc};

use serde_json::Value;
use shared::{
    domain::EventId,
    protocol::{Event, StudentIdentity},
};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::{
    error::Result,
    identity::{self, IdentityProfile},
    notice::Notice,
    store::{KeyValueStore, StoreError},
    EventsApi,
};

pub const EVENTS_LOAD_FAILED: &str = "Failed to load events";
pub const REGISTRATION_SUCCEEDED: &str = "Successfully registered for the event!";
const REGISTRATION_FALLBACK_REASON: &str = "Failed to register for event";

#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    Registered(Value),
    Failed { reason: String },
    /// A registration for this event is still awaiting its response.
    AlreadyInFlight,
}

#[derive(Default)]
struct StudentState {
    events: Vec<Event>,
    in_flight: HashSet<EventId>,
    notices: Vec<Notice>,
}

pub struct StudentDashboard {
    api: Arc<dyn EventsApi>,
    store: Arc<dyn KeyValueStore>,
    identity: StudentIdentity,
    inner: Mutex<StudentState>,
}

impl StudentDashboard {
    /// Loads the stored identity, generating and persisting one if this store has none.
    pub fn open(
        api: Arc<dyn EventsApi>,
        store: Arc<dyn KeyValueStore>,
        profile: &IdentityProfile,
    ) -> std::result::Result<Self, StoreError> {
        let identity = identity::load_or_create_identity(store.as_ref(), profile)?;
        Ok(Self {
            api,
            store,
            identity,
            inner: Mutex::new(StudentState::default()),
        })
    }

    pub fn identity(&self) -> &StudentIdentity {
        &self.identity
    }

    pub async fn load_events(&self) -> Result<usize> {
        match self.api.list_events().await {
            Ok(events) => {
                let count = events.len();
                self.inner.lock().await.events = events;
                Ok(count)
            }
            Err(err) => {
                error!(error = %err, "failed to fetch events");
                self.inner
                    .lock()
                    .await
                    .notices
                    .push(Notice::Error(EVENTS_LOAD_FAILED.to_string()));
                Err(err)
            }
        }
    }

    pub async fn events(&self) -> Vec<Event> {
        self.inner.lock().await.events.clone()
    }

    pub async fn is_registering(&self, id: EventId) -> bool {
        self.inner.lock().await.in_flight.contains(&id)
    }

    /// Registers for one event. Only that event is blocked while the request is
    /// outstanding; it is released again whether the request succeeds or fails.
    pub async fn register(&self, id: EventId) -> RegisterOutcome {
        {
            let mut guard = self.inner.lock().await;
            if !guard.in_flight.insert(id) {
                return RegisterOutcome::AlreadyInFlight;
            }
        }

        let result = self.api.register(id, &self.identity).await;

        let mut guard = self.inner.lock().await;
        guard.in_flight.remove(&id);
        match result {
            Ok(body) => {
                info!(event_id = id.0, username = %self.identity.username, response = %body, "registration successful");
                guard
                    .notices
                    .push(Notice::Info(REGISTRATION_SUCCEEDED.to_string()));
                RegisterOutcome::Registered(body)
            }
            Err(err) => {
                error!(event_id = id.0, error = %err, "registration error");
                let reason = err.user_message(REGISTRATION_FALLBACK_REASON);
                guard
                    .notices
                    .push(Notice::Error(format!("Registration failed: {reason}")));
                RegisterOutcome::Failed { reason }
            }
        }
    }

    /// Clears the session flags; the identity itself is kept for the next session.
    pub fn logout(&self) -> std::result::Result<(), StoreError> {
        identity::clear_session_flags(self.store.as_ref())?;
        info!(username = %self.identity.username, "logged out");
        Ok(())
    }

    pub async fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.inner.lock().await.notices)
    }
}

#[cfg(test)]
#[path = "tests/student_tests.rs"]
mod tests;
