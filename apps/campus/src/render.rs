//! Plain-text rendering of dashboard state.

use std::fmt::Write as _;

use chrono::Local;
use client_core::DashboardStats;
use shared::protocol::{Event, Registration};

pub const ADMIN_PREVIEW_CHARS: usize = 60;
pub const STUDENT_PREVIEW_CHARS: usize = 80;

/// `Mon, Jan 6, 2025`; unparseable dates are shown as sent.
pub fn format_event_date(event: &Event) -> String {
    match (event.event_date(), event.date.as_deref()) {
        (Some(date), _) => date.format("%a, %b %-d, %Y").to_string(),
        (None, Some(raw)) if !raw.trim().is_empty() => raw.to_string(),
        _ => "Date TBD".to_string(),
    }
}

pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub fn event_count_label(count: usize) -> String {
    if count == 1 {
        "1 Event".to_string()
    } else {
        format!("{count} Events")
    }
}

pub fn registrant_count_label(count: usize) -> String {
    let noun = if count == 1 { "Student" } else { "Students" };
    format!("Total: {count} {noun}")
}

pub fn render_events(events: &[Event], preview_chars: usize) -> String {
    if events.is_empty() {
        return "No events yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Upcoming Events ({})", event_count_label(events.len()));
    for event in events {
        let _ = writeln!(out);
        let _ = writeln!(out, "#{} {}", event.id, event.title);
        if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "    {}", preview(description, preview_chars));
        }
        let _ = writeln!(out, "    Date:         {}", format_event_date(event));
        if let Some(time) = event.time.as_deref().filter(|t| !t.is_empty()) {
            let _ = writeln!(out, "    Time:         {time}");
        }
        if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
            let _ = writeln!(out, "    Location:     {location}");
        }
        if let Some(link) = event.registration_link.as_deref().filter(|l| !l.is_empty()) {
            let _ = writeln!(out, "    Registration: {link}");
        }
    }
    out
}

fn registered_at_label(registration: &Registration) -> String {
    registration
        .registered_at_utc()
        .map(|at| {
            at.with_timezone(&Local)
                .format("%-m/%-d/%Y, %-I:%M:%S %p")
                .to_string()
        })
        .unwrap_or_else(|| registration.registered_at.clone())
}

fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("N/A")
}

pub fn render_registrations(event: &Event, registrations: &[Registration]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Registered Students: {}", event.title);
    let _ = write!(out, "{}", format_event_date(event));
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        let _ = write!(out, " @ {location}");
    }
    let _ = writeln!(out);

    if registrations.is_empty() {
        let _ = writeln!(out, "No students have registered for this event yet.");
        return out;
    }

    let _ = writeln!(out, "{}", registrant_count_label(registrations.len()));
    let _ = writeln!(
        out,
        "{:<8} {:<24} {:<28} {:<28} {:<10} Registered At",
        "ID", "Name", "Username", "Email", "Department"
    );
    for registration in registrations {
        let _ = writeln!(
            out,
            "{:<8} {:<24} {:<28} {:<28} {:<10} {}",
            registration.student_id,
            registration.display_name(),
            registration.username,
            or_na(registration.email.as_deref()),
            or_na(registration.department.as_deref()),
            registered_at_label(registration)
        );
    }
    out
}

pub fn render_stats(stats: &DashboardStats) -> String {
    format!(
        "Active Events:       {}\nTotal Registrations: {}\n",
        stats.active_events, stats.loaded_registrations
    )
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
