//! Administrator dashboard: event CRUD and per-event registrant lists.

use std::sync::Arc;

use shared::{
    domain::EventId,
    protocol::{Event, EventDraft, Registration},
};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    error::{ClientError, Result},
    notice::Notice,
    EventsApi,
};

pub const REGISTRATIONS_LOAD_FAILED: &str = "Failed to load registered students";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub event_id: EventId,
    pub draft: EventDraft,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationsPanel {
    pub selected: Option<Event>,
    pub loading: bool,
    pub registrations: Vec<Registration>,
}

impl RegistrationsPanel {
    pub fn is_open(&self) -> bool {
        self.selected.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub active_events: usize,
    pub loaded_registrations: usize,
}

/// Registrant totals across every listed event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationTotals {
    pub stats: DashboardStats,
    /// Events whose registrant list could not be loaded; they are missing from the count.
    pub failed: Vec<EventId>,
}

impl RegistrationTotals {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted,
}

#[derive(Default)]
struct AdminState {
    events: Vec<Event>,
    create_form_open: bool,
    edit: Option<EditSession>,
    registrations: RegistrationsPanel,
    notices: Vec<Notice>,
}

pub struct AdminDashboard {
    api: Arc<dyn EventsApi>,
    inner: Mutex<AdminState>,
}

impl AdminDashboard {
    pub fn new(api: Arc<dyn EventsApi>) -> Self {
        Self {
            api,
            inner: Mutex::new(AdminState::default()),
        }
    }

    /// Replaces the list with the server's. A failed fetch leaves the previous list in place.
    pub async fn refresh(&self) -> Result<usize> {
        match self.api.list_events().await {
            Ok(events) => {
                let count = events.len();
                self.inner.lock().await.events = events;
                Ok(count)
            }
            Err(err) => {
                error!(error = %err, "failed to fetch events");
                Err(err)
            }
        }
    }

    pub async fn events(&self) -> Vec<Event> {
        self.inner.lock().await.events.clone()
    }

    pub async fn stats(&self) -> DashboardStats {
        let guard = self.inner.lock().await;
        DashboardStats {
            active_events: guard.events.len(),
            loaded_registrations: guard.registrations.registrations.len(),
        }
    }

    pub async fn open_create_form(&self) {
        self.inner.lock().await.create_form_open = true;
    }

    pub async fn is_create_form_open(&self) -> bool {
        self.inner.lock().await.create_form_open
    }

    /// Closes the create form and the edit modal, then re-fetches.
    pub async fn close_forms(&self) {
        {
            let mut guard = self.inner.lock().await;
            guard.create_form_open = false;
            guard.edit = None;
        }
        // refresh already logs the failure
        let _ = self.refresh().await;
    }

    pub async fn create_event(&self, draft: EventDraft) -> Result<Option<Event>> {
        draft.validate()?;
        match self.api.create_event(&draft).await {
            Ok(created) => {
                info!(title = %draft.title, "event created");
                self.close_forms().await;
                Ok(created)
            }
            Err(err) => {
                error!(error = %err, "create failed");
                Err(err)
            }
        }
    }

    pub async fn begin_edit(&self, id: EventId) -> Result<EditSession> {
        let mut guard = self.inner.lock().await;
        let event = guard
            .events
            .iter()
            .find(|event| event.id == id)
            .ok_or(ClientError::UnknownEvent(id))?;
        let session = EditSession {
            event_id: id,
            draft: EventDraft::from_event(event),
        };
        guard.edit = Some(session.clone());
        Ok(session)
    }

    pub async fn edit_session(&self) -> Option<EditSession> {
        self.inner.lock().await.edit.clone()
    }

    pub async fn edit_field(&self, name: &str, value: impl Into<String>) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let session = guard.edit.as_mut().ok_or(ClientError::NoActiveEdit)?;
        session.draft.set_field(name, value)?;
        Ok(())
    }

    /// Sends the edited values. On failure the modal stays open with the edits intact.
    pub async fn submit_edit(&self) -> Result<()> {
        let session = self.edit_session().await.ok_or(ClientError::NoActiveEdit)?;
        session.draft.validate()?;

        if let Err(err) = self
            .api
            .update_event(session.event_id, &session.draft)
            .await
        {
            error!(event_id = session.event_id.0, error = %err, "update failed");
            return Err(err);
        }

        info!(event_id = session.event_id.0, "event updated");
        {
            let mut guard = self.inner.lock().await;
            guard.edit = None;
        }
        let _ = self.refresh().await;
        Ok(())
    }

    /// Deletes after `confirm` agrees. The event is dropped from the local list on success;
    /// there is no re-fetch, so the list can drift from the server until the next refresh.
    pub async fn delete_event(
        &self,
        id: EventId,
        confirm: impl FnOnce(Option<&Event>) -> bool,
    ) -> Result<DeleteOutcome> {
        let event = {
            let guard = self.inner.lock().await;
            guard.events.iter().find(|event| event.id == id).cloned()
        };

        if !confirm(event.as_ref()) {
            return Ok(DeleteOutcome::Cancelled);
        }

        if let Err(err) = self.api.delete_event(id).await {
            error!(event_id = id.0, error = %err, "delete failed");
            return Err(err);
        }

        let mut guard = self.inner.lock().await;
        guard.events.retain(|event| event.id != id);
        info!(event_id = id.0, remaining = guard.events.len(), "event deleted");
        Ok(DeleteOutcome::Deleted)
    }

    pub async fn view_registrations(&self, id: EventId) -> Result<Vec<Registration>> {
        {
            let mut guard = self.inner.lock().await;
            let event = guard
                .events
                .iter()
                .find(|event| event.id == id)
                .cloned()
                .ok_or(ClientError::UnknownEvent(id))?;
            guard.registrations = RegistrationsPanel {
                selected: Some(event),
                loading: true,
                registrations: Vec::new(),
            };
        }

        let result = self.api.list_registrations(id).await;

        let mut guard = self.inner.lock().await;
        let still_selected = guard
            .registrations
            .selected
            .as_ref()
            .is_some_and(|event| event.id == id);
        if !still_selected {
            warn!(event_id = id.0, "registrations panel closed before load finished");
        }

        match result {
            Ok(registrations) => {
                if still_selected {
                    guard.registrations.registrations = registrations.clone();
                    guard.registrations.loading = false;
                }
                Ok(registrations)
            }
            Err(err) => {
                error!(event_id = id.0, error = %err, "failed to fetch registrations");
                guard
                    .notices
                    .push(Notice::Error(REGISTRATIONS_LOAD_FAILED.to_string()));
                if still_selected {
                    guard.registrations.registrations.clear();
                    guard.registrations.loading = false;
                }
                Err(err)
            }
        }
    }

    /// Loads the registrants of every listed event in turn and sums them.
    /// The registrations panel is closed afterwards.
    pub async fn registration_totals(&self) -> RegistrationTotals {
        let events = self.events().await;
        let mut totals = RegistrationTotals {
            stats: DashboardStats {
                active_events: events.len(),
                loaded_registrations: 0,
            },
            failed: Vec::new(),
        };

        for event in &events {
            match self.view_registrations(event.id).await {
                Ok(registrations) => totals.stats.loaded_registrations += registrations.len(),
                Err(_) => totals.failed.push(event.id),
            }
        }
        self.close_registrations().await;

        if totals.is_partial() {
            warn!(failed = ?totals.failed, "registration totals are incomplete");
        }
        totals
    }

    pub async fn registrations_panel(&self) -> RegistrationsPanel {
        self.inner.lock().await.registrations.clone()
    }

    pub async fn close_registrations(&self) {
        self.inner.lock().await.registrations = RegistrationsPanel::default();
    }

    pub async fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.inner.lock().await.notices)
    }
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
