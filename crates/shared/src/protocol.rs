use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    domain::{EventId, RegistrationId, StudentId},
    error::ValidationError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub registration_link: Option<String>,
}

impl Event {
    /// Calendar date of the event; the backend sends either `YYYY-MM-DD` or a full timestamp.
    pub fn event_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_event_date)
    }
}

pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

pub fn parse_event_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Body of the create and update requests. Mirrors the event form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub registration_link: String,
}

impl EventDraft {
    pub const FIELDS: [&'static str; 6] = [
        "title",
        "description",
        "date",
        "time",
        "location",
        "registration_link",
    ];

    /// Pre-fills the edit form. Dates and times are normalised to what the form inputs accept.
    pub fn from_event(event: &Event) -> Self {
        let date = match event.date.as_deref() {
            Some(raw) => parse_event_date(raw)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| raw.to_string()),
            None => String::new(),
        };
        let time = match event.time.as_deref() {
            Some(raw) => parse_event_time(raw)
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_else(|| raw.to_string()),
            None => String::new(),
        };

        Self {
            title: event.title.clone(),
            description: event.description.clone().unwrap_or_default(),
            date,
            time,
            location: event.location.clone().unwrap_or_default(),
            registration_link: event.registration_link.clone().unwrap_or_default(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "title" => &self.title,
            "description" => &self.description,
            "date" => &self.date,
            "time" => &self.time,
            "location" => &self.location,
            "registration_link" => &self.registration_link,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), ValidationError> {
        let slot = match name {
            "title" => &mut self.title,
            "description" => &mut self.description,
            "date" => &mut self.date,
            "time" => &mut self.time,
            "location" => &mut self.location,
            "registration_link" => &mut self.registration_link,
            other => return Err(ValidationError::UnknownField(other.to_string())),
        };
        *slot = value.into();
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for name in Self::FIELDS {
            let value = self.field(name).unwrap_or_default();
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField { field: name });
            }
        }

        if NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").is_err() {
            return Err(ValidationError::InvalidDate {
                value: self.date.clone(),
            });
        }
        if NaiveTime::parse_from_str(self.time.trim(), "%H:%M").is_err() {
            return Err(ValidationError::InvalidTime {
                value: self.time.clone(),
            });
        }

        let link = Url::parse(self.registration_link.trim()).map_err(|e| {
            ValidationError::InvalidLink {
                value: self.registration_link.clone(),
                reason: e.to_string(),
            }
        })?;
        if !matches!(link.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidLink {
                value: self.registration_link.clone(),
                reason: format!("unsupported scheme '{}'", link.scheme()),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub registration_id: RegistrationId,
    pub student_id: StudentId,
    #[serde(default)]
    pub name: Option<String>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    pub registered_at: String,
}

impl Registration {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(self.username.as_str())
    }

    pub fn registered_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.registered_at.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationsResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub registrations: Vec<Registration>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Registration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Registration>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of the register request. Derived entirely from the locally stored username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentIdentity {
    pub username: String,
    pub name: String,
    pub email: String,
    pub department: String,
}

impl StudentIdentity {
    pub fn from_username(username: &str, email_domain: &str, department: &str) -> Self {
        Self {
            username: username.to_string(),
            name: username.to_string(),
            email: format!("{username}@{email_domain}"),
            department: department.to_string(),
        }
    }
}
