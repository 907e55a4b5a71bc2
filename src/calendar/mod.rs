mod error;
mod event;
mod google;

pub use error::CalendarError;
pub use event::{default_reminders, EventDescriptor, Reminder};
pub use google::GoogleCalendar;

use crate::report::LocalZone;
use crate::scheduler::{Operation, ScheduledEvent};

/// Destination for calendar events, keyed by calendar id.
pub trait CalendarSink {
    /// Insert one event and return a link to it.
    fn submit(&mut self, calendar_id: &str, event: &EventDescriptor)
        -> Result<String, CalendarError>;
}

/// Builds event descriptors for scheduled passes and hands them to a sink.
pub struct Publisher {
    sink: Box<dyn CalendarSink>,
    zone: LocalZone,
    reminders: Vec<Reminder>,
}

impl Publisher {
    pub fn new(sink: Box<dyn CalendarSink>, zone: LocalZone, reminders: Vec<Reminder>) -> Self {
        Self {
            sink,
            zone,
            reminders,
        }
    }

    pub fn publish(
        &mut self,
        calendar_id: &str,
        operation: &Operation,
        event: &ScheduledEvent,
    ) -> Result<String, CalendarError> {
        let descriptor = EventDescriptor::new(operation, event, &self.zone, &self.reminders);
        log::debug!(
            "Submitting {} to {} for {}",
            descriptor.summary,
            calendar_id,
            descriptor.attendee().unwrap_or("nobody")
        );
        self.sink.submit(calendar_id, &descriptor)
    }
}
