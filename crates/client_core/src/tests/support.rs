//! Scripted in-memory `EventsApi` for exercising the dashboards without a server.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::{EventId, RegistrationId, StudentId},
    protocol::{Event, EventDraft, Registration, StudentIdentity},
};
use tokio::sync::{Mutex, Notify};

use crate::{
    error::{ClientError, Result},
    EventsApi,
};

pub fn event(id: i64, title: &str) -> Event {
    Event {
        id: EventId(id),
        title: title.to_string(),
        description: Some(format!("{title} description")),
        date: Some("2025-03-14".into()),
        time: Some("10:00".into()),
        location: Some("Main Hall".into()),
        registration_link: Some(format!("https://forms.example.edu/{id}")),
    }
}

pub fn registration(id: i64, username: &str) -> Registration {
    Registration {
        registration_id: RegistrationId(id),
        student_id: StudentId(id + 100),
        name: None,
        username: username.to_string(),
        email: Some(format!("{username}@univ.edu")),
        department: Some("CSE".into()),
        registered_at: "2025-03-01T08:00:00Z".into(),
    }
}

fn status_error(status: u16, message: Option<&str>) -> ClientError {
    ClientError::Status {
        status,
        message: message.map(str::to_string),
    }
}

#[derive(Default)]
pub struct ScriptedApi {
    pub events: Mutex<Vec<Event>>,
    pub registrations: Mutex<Vec<Registration>>,
    pub list_calls: AtomicUsize,
    pub fail_list: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_registrations: AtomicBool,
    /// Events whose registrant list fails even when `fail_registrations` is off.
    pub failing_registrations: Mutex<HashSet<EventId>>,
    /// `(status, body message)` returned by `register` when set.
    pub register_failure: Mutex<Option<(u16, Option<String>)>>,
    pub created: Mutex<Vec<EventDraft>>,
    pub updates: Mutex<Vec<(EventId, EventDraft)>>,
    pub deleted: Mutex<Vec<EventId>>,
    pub register_calls: Mutex<Vec<(EventId, StudentIdentity)>>,
    /// When set, `register` signals `register_entered` and then waits for `register_gate`.
    pub gate_register: AtomicBool,
    pub register_entered: Notify,
    pub register_gate: Notify,
}

impl ScriptedApi {
    pub fn with_events(events: Vec<Event>) -> Arc<Self> {
        let api = Self::default();
        *api.events.try_lock().expect("fresh mutex") = events;
        Arc::new(api)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventsApi for ScriptedApi {
    async fn list_events(&self) -> Result<Vec<Event>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(status_error(500, Some("database unavailable")));
        }
        Ok(self.events.lock().await.clone())
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<Option<Event>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(status_error(400, Some("title taken")));
        }
        self.created.lock().await.push(draft.clone());
        let mut events = self.events.lock().await;
        let id = events.iter().map(|e| e.id.0).max().unwrap_or(0) + 1;
        let created = Event {
            id: EventId(id),
            title: draft.title.clone(),
            description: Some(draft.description.clone()),
            date: Some(draft.date.clone()),
            time: Some(draft.time.clone()),
            location: Some(draft.location.clone()),
            registration_link: Some(draft.registration_link.clone()),
        };
        events.push(created.clone());
        Ok(Some(created))
    }

    async fn update_event(&self, id: EventId, draft: &EventDraft) -> Result<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(status_error(500, None));
        }
        self.updates.lock().await.push((id, draft.clone()));
        if let Some(event) = self.events.lock().await.iter_mut().find(|e| e.id == id) {
            event.title = draft.title.clone();
            event.location = Some(draft.location.clone());
        }
        Ok(())
    }

    async fn delete_event(&self, id: EventId) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(status_error(404, Some("Event not found")));
        }
        self.deleted.lock().await.push(id);
        Ok(())
    }

    async fn list_registrations(&self, id: EventId) -> Result<Vec<Registration>> {
        if self.fail_registrations.load(Ordering::SeqCst)
            || self.failing_registrations.lock().await.contains(&id)
        {
            return Err(status_error(500, None));
        }
        Ok(self.registrations.lock().await.clone())
    }

    async fn register(&self, id: EventId, identity: &StudentIdentity) -> Result<Value> {
        self.register_calls
            .lock()
            .await
            .push((id, identity.clone()));

        if self.gate_register.load(Ordering::SeqCst) {
            self.register_entered.notify_one();
            self.register_gate.notified().await;
        }

        if let Some((status, message)) = self.register_failure.lock().await.clone() {
            return Err(status_error(status, message.as_deref()));
        }
        Ok(json!({ "message": "registered", "event_id": id.0 }))
    }
}
