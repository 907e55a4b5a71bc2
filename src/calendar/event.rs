use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::report::LocalZone;
use crate::scheduler::{Operation, ScheduledEvent};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReminderMethod {
    Popup,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub minutes: u32,
}

/// One hour and ten minutes ahead, as pop-ups.
pub fn default_reminders() -> Vec<Reminder> {
    vec![
        Reminder {
            method: ReminderMethod::Popup,
            minutes: 60,
        },
        Reminder {
            method: ReminderMethod::Popup,
            minutes: 10,
        },
    ]
}

/// Calendar event body, shaped like a Google Calendar v3 event resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDescriptor {
    pub summary: String,
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    pub reminders: Reminders,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: DateTime<FixedOffset>,
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attendee {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    pub overrides: Vec<Reminder>,
}

impl EventDescriptor {
    pub fn new(
        operation: &Operation,
        event: &ScheduledEvent,
        zone: &LocalZone,
        reminders: &[Reminder],
    ) -> Self {
        let summary = format!(
            "{} {:.1}° {}",
            operation.label, event.pass.max_elevation_deg, operation.operation_type
        );
        let time = |at| EventTime {
            date_time: zone.localize(at),
            time_zone: zone.name.clone(),
        };

        Self {
            summary: summary.trim_end().to_string(),
            description: operation.description.clone(),
            start: time(event.pass.aos),
            end: time(event.pass.los),
            attendees: event
                .operator
                .iter()
                .map(|o| Attendee {
                    email: o.to_string(),
                })
                .collect(),
            reminders: Reminders {
                use_default: false,
                overrides: reminders.to_vec(),
            },
        }
    }

    pub fn attendee(&self) -> Option<&str> {
        self.attendees.first().map(|a| a.email.as_str())
    }
}
