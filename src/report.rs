use std::io::{self, Write};

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Serialize;

use crate::scheduler::{Operation, ScheduledEvent};

const UNSTAFFED: &str = "none";

/// The time zone events are reported and booked in.
///
/// One fixed offset covers the whole horizon, so the zone must not observe
/// DST. A week that crosses a DST change would be shifted by the difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalZone {
    /// IANA name handed to the calendar, e.g. `Asia/Tokyo`.
    pub name: String,
    pub offset: FixedOffset,
}

impl LocalZone {
    pub fn utc() -> Self {
        Self {
            name: "UTC".to_string(),
            offset: Utc.fix(),
        }
    }

    pub fn localize(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.offset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub sequence: u32,
    pub aos: DateTime<FixedOffset>,
    pub los: DateTime<FixedOffset>,
    pub duration_seconds: i64,
    pub max_elevation_deg: f64,
    pub operator: String,
}

impl ReportRow {
    pub fn new(event: &ScheduledEvent, zone: &LocalZone) -> Self {
        Self {
            sequence: event.sequence,
            aos: zone.localize(event.pass.aos),
            los: zone.localize(event.pass.los),
            duration_seconds: event.pass.duration_seconds,
            max_elevation_deg: event.pass.max_elevation_deg,
            operator: event
                .operator
                .as_ref()
                .map(|o| o.to_string())
                .unwrap_or_else(|| UNSTAFFED.to_string()),
        }
    }
}

/// Receives each operation's rows once its schedule is complete.
pub trait ReportSink {
    fn write_operation(
        &mut self,
        operation: &Operation,
        events: &[ScheduledEvent],
    ) -> io::Result<()>;
}

/// Human-readable comma-separated table.
pub struct TableReport<W> {
    out: W,
    zone: LocalZone,
}

impl<W: Write> TableReport<W> {
    pub fn new(out: W, zone: LocalZone) -> Self {
        Self { out, zone }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for TableReport<W> {
    fn write_operation(
        &mut self,
        operation: &Operation,
        events: &[ScheduledEvent],
    ) -> io::Result<()> {
        writeln!(
            self.out,
            "# {} ({}), min. el. {}°, times in {}",
            operation.name, operation.satellite, operation.min_elevation_deg, self.zone.name
        )?;
        writeln!(self.out, "No., Date, AOS, LOS, Duration, Max. el., Operator")?;
        for event in events {
            let row = ReportRow::new(event, &self.zone);
            writeln!(
                self.out,
                "{}, {}, {}, {}, {:.2}, {}",
                row.sequence,
                row.aos.format("%Y/%m/%d, %H:%M:%S"),
                row.los.format("%H:%M:%S"),
                format_duration(row.duration_seconds),
                row.max_elevation_deg,
                row.operator
            )?;
        }
        writeln!(self.out)
    }
}

/// One JSON document per operation, newline separated.
pub struct JsonReport<W> {
    out: W,
    zone: LocalZone,
}

#[derive(Serialize)]
struct JsonOperation<'a> {
    operation: &'a str,
    satellite: &'a str,
    min_elevation_deg: f64,
    time_zone: &'a str,
    passes: Vec<ReportRow>,
}

impl<W: Write> JsonReport<W> {
    pub fn new(out: W, zone: LocalZone) -> Self {
        Self { out, zone }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonReport<W> {
    fn write_operation(
        &mut self,
        operation: &Operation,
        events: &[ScheduledEvent],
    ) -> io::Result<()> {
        let doc = JsonOperation {
            operation: &operation.name,
            satellite: &operation.satellite,
            min_elevation_deg: operation.min_elevation_deg,
            time_zone: &self.zone.name,
            passes: events
                .iter()
                .map(|e| ReportRow::new(e, &self.zone))
                .collect(),
        };
        serde_json::to_writer(&mut self.out, &doc)?;
        writeln!(self.out)
    }
}

/// `H:MM:SS`, hours unpadded.
fn format_duration(seconds: i64) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
