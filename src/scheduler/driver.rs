use crate::calendar::Publisher;
use crate::predict::{
    search_pass, ElementCatalog, GroundStation, PeakSearch, PredictError, Propagator, Satellite,
};
use crate::report::ReportSink;
use crate::scheduler::{Horizon, Operation, ScheduledEvent};

/// Outcome of a multi-operation run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub scheduled: usize,
    pub submitted: usize,
    pub submission_failures: usize,
    /// Operations left out because their satellite was unavailable.
    pub skipped: Vec<String>,
    /// Set once the calendar rejects our credentials; nothing is submitted after that.
    pub auth_failure: Option<String>,
}

/// Walks each operation through the horizon pass by pass.
pub struct Driver<'a, P: ?Sized> {
    station: &'a GroundStation,
    propagator: &'a P,
    peak: PeakSearch,
}

impl<'a, P: Propagator + ?Sized> Driver<'a, P> {
    pub fn new(station: &'a GroundStation, propagator: &'a P, peak: PeakSearch) -> Self {
        Self {
            station,
            propagator,
            peak,
        }
    }

    /// Schedule every qualifying pass of `satellite` inside `horizon`.
    ///
    /// A pass counts while its LOS is not past the end of the horizon.
    /// Passes below the operation's threshold only advance the cursor.
    pub fn plan(
        &self,
        operation: &mut Operation,
        satellite: &Satellite,
        horizon: &Horizon,
    ) -> Result<Vec<ScheduledEvent>, PredictError> {
        let mut events = Vec::new();
        let mut cursor = horizon.start;
        let mut sequence = 0;

        loop {
            let found = search_pass(self.propagator, self.station, satellite, cursor, self.peak)?;
            cursor = found.resume_at;
            if horizon.is_exceeded_by(cursor) {
                break;
            }

            let pass = found.pass;
            if !operation.qualifies(&pass) {
                log::trace!(
                    "{}: discarding pass at {} ({:.2}°)",
                    operation.name,
                    pass.aos,
                    pass.max_elevation_deg
                );
                continue;
            }

            sequence += 1;
            let operator = operation.assign();
            events.push(ScheduledEvent {
                sequence,
                operation: operation.name.clone(),
                pass,
                operator,
            });
        }

        Ok(events)
    }

    /// Plan each operation in order, report it, and submit its events.
    ///
    /// Missing elements or a propagation failure skip that operation only.
    /// Submission failures are counted and the run carries on; an auth
    /// failure stops submission but not reporting.
    pub fn run(
        &self,
        operations: &mut [Operation],
        catalog: &ElementCatalog,
        horizon: &Horizon,
        mut calendar: Option<&mut Publisher>,
        report: &mut dyn ReportSink,
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        for operation in operations.iter_mut() {
            let Some(satellite) = catalog.get(&operation.satellite) else {
                log::warn!(
                    "Skipping operation {}: no orbital elements for {}",
                    operation.name,
                    operation.satellite
                );
                summary.skipped.push(operation.name.clone());
                continue;
            };

            log::info!(
                "Planning {} for {} from {} to {}",
                operation.name,
                satellite.name,
                horizon.start,
                horizon.end()
            );
            let events = match self.plan(operation, satellite, horizon) {
                Ok(events) => events,
                Err(e) => {
                    log::error!("Skipping operation {}: {}", operation.name, e);
                    summary.skipped.push(operation.name.clone());
                    continue;
                }
            };
            log::info!("{}: {} passes scheduled", operation.name, events.len());
            summary.scheduled += events.len();

            if let Err(e) = report.write_operation(operation, &events) {
                log::error!("Failed to write report for {}: {}", operation.name, e);
            }

            if let Some(publisher) = calendar.as_deref_mut() {
                submit(publisher, operation, &events, &mut summary);
            }
        }

        summary
    }
}

fn submit(
    publisher: &mut Publisher,
    operation: &Operation,
    events: &[ScheduledEvent],
    summary: &mut RunSummary,
) {
    if summary.auth_failure.is_some() {
        return;
    }
    let Some(calendar_id) = operation.calendar_id.as_deref() else {
        log::debug!("{}: no calendar configured", operation.name);
        return;
    };

    for event in events {
        match publisher.publish(calendar_id, operation, event) {
            Ok(link) => {
                log::info!("Event created: {}", link);
                summary.submitted += 1;
            }
            Err(e) if e.is_fatal() => {
                log::error!("{}; no further events will be submitted", e);
                summary.auth_failure = Some(e.to_string());
                return;
            }
            Err(e) => {
                log::error!(
                    "Failed to submit pass {} of {}: {}",
                    event.sequence,
                    operation.name,
                    e
                );
                summary.submission_failures += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{default_reminders, CalendarError, CalendarSink, EventDescriptor};
    use crate::predict::testing::{base, iss, kyutech, periodic, triangle, Profile, ISS_TLE};
    use crate::report::{LocalZone, TableReport};
    use crate::scheduler::{Operator, OperatorRotation};
    use chrono::{DateTime, Duration, Utc};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const PERIOD: i64 = 5400;

    fn operation(min_elevation_deg: f64, operators: &[&str]) -> Operation {
        Operation {
            name: "kitsune".to_string(),
            satellite: "ISS (ZARYA)".to_string(),
            label: "KTN".to_string(),
            operation_type: String::new(),
            description: "This tracks KITSUNE.".to_string(),
            min_elevation_deg,
            calendar_id: Some("ops@group.calendar.google.com".to_string()),
            operators: operators.iter().map(|o| Operator::new(*o)).collect(),
        }
    }

    fn catalog() -> ElementCatalog {
        let text = format!("{}\n{}\n{}\n", ISS_TLE.0, ISS_TLE.1, ISS_TLE.2);
        ElementCatalog::from_tle_text(&text, "test").unwrap()
    }

    /// Passes every 90 minutes whose peak cycles through 5°, 20°, 40°.
    fn cycling_peaks(t: i64) -> f64 {
        let peaks = [5.0, 20.0, 40.0];
        let orbit = t.div_euclid(PERIOD) as usize;
        periodic(t, PERIOD, 600, 900, 1200, peaks[orbit % peaks.len()])
    }

    #[derive(Clone, Default)]
    struct Recording {
        submitted: Rc<RefCell<Vec<(String, EventDescriptor)>>>,
        fail_on: Option<usize>,
        auth_fail_on: Option<usize>,
    }

    impl CalendarSink for Recording {
        fn submit(
            &mut self,
            calendar_id: &str,
            event: &EventDescriptor,
        ) -> Result<String, CalendarError> {
            let n = self.submitted.borrow().len();
            if self.auth_fail_on == Some(n) {
                return Err(CalendarError::Auth("token revoked".to_string()));
            }
            self.submitted
                .borrow_mut()
                .push((calendar_id.to_string(), event.clone()));
            if self.fail_on == Some(n) {
                return Err(CalendarError::Rejected {
                    status: 500,
                    body: "backend error".to_string(),
                });
            }
            Ok(format!("https://calendar.example/event/{n}"))
        }
    }

    /// Fails the first propagation, as SGP4 does for a decayed orbit, then
    /// defers to `inner`.
    struct FailsOnce<P> {
        inner: P,
        failed: Cell<bool>,
    }

    impl<P: Propagator> Propagator for FailsOnce<P> {
        fn elevation_deg(
            &self,
            station: &GroundStation,
            satellite: &Satellite,
            at: DateTime<Utc>,
        ) -> Result<f64, PredictError> {
            if !self.failed.replace(true) {
                return Err(PredictError::Propagation("orbit decayed".to_string()));
            }
            self.inner.elevation_deg(station, satellite, at)
        }
    }

    fn publisher(sink: Recording) -> Publisher {
        Publisher::new(Box::new(sink), LocalZone::utc(), default_reminders())
    }

    #[test]
    fn assigns_qualifying_passes_round_robin() {
        // Three 45° passes in a 4.5 hour horizon.
        let propagator = Profile::new(|t| periodic(t, PERIOD, 120, 420, 720, 45.0));
        let station = kyutech();
        let driver = Driver::new(&station, &propagator, PeakSearch::Greedy);
        let mut op = operation(10.0, &["a", "b"]);

        let horizon = Horizon::new(base(), Duration::seconds(3 * PERIOD));
        let events = driver.plan(&mut op, &iss(), &horizon).unwrap();

        let operators: Vec<_> = events
            .iter()
            .map(|e| e.operator.as_ref().unwrap().as_str())
            .collect();
        assert_eq!(operators, ["a", "b", "a"]);
        assert_eq!(
            op.operators.queue().map(Operator::as_str).collect::<Vec<_>>(),
            ["b", "a"]
        );
        let sequences: Vec<_> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, [1, 2, 3]);
        assert_eq!(events[1].pass.aos, base() + Duration::seconds(PERIOD + 120));
    }

    #[test]
    fn low_passes_leave_no_trace() {
        let propagator = Profile::new(cycling_peaks);
        let station = kyutech();
        let driver = Driver::new(&station, &propagator, PeakSearch::Greedy);
        let mut op = operation(10.0, &["a", "b", "c"]);

        let horizon = Horizon::new(base(), Duration::seconds(6 * PERIOD));
        let events = driver.plan(&mut op, &iss(), &horizon).unwrap();

        // Orbits 1, 2, 4, 5 qualify; 0 and 3 peak at 5°.
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.pass.max_elevation_deg >= 10.0));
        assert_eq!(
            events.iter().map(|e| e.sequence).collect::<Vec<_>>(),
            [1, 2, 3, 4]
        );
        assert_eq!(
            events
                .iter()
                .map(|e| e.operator.clone().unwrap().0)
                .collect::<Vec<_>>(),
            ["a", "b", "c", "a"]
        );
        assert_eq!(events[0].pass.aos, base() + Duration::seconds(PERIOD + 600));
    }

    #[test]
    fn pass_ending_on_boundary_is_included() {
        let propagator = Profile::new(|t| triangle(t, 120, 420, 720, 45.0));
        let station = kyutech();
        let driver = Driver::new(&station, &propagator, PeakSearch::Greedy);

        let mut op = operation(10.0, &[]);
        let exact = Horizon::new(base(), Duration::seconds(720));
        assert_eq!(driver.plan(&mut op, &iss(), &exact).unwrap().len(), 1);

        let short = Horizon::new(base(), Duration::seconds(719));
        assert!(driver.plan(&mut op, &iss(), &short).unwrap().is_empty());
    }

    #[test]
    fn events_fall_inside_horizon() {
        let propagator = Profile::new(|t| periodic(t, 5000, 1000, 1300, 1700, 30.0));
        let station = kyutech();
        let driver = Driver::new(&station, &propagator, PeakSearch::Greedy);
        let mut op = operation(0.0, &["a"]);

        let horizon = Horizon::new(base() + Duration::seconds(1200), Duration::hours(12));
        let events = driver.plan(&mut op, &iss(), &horizon).unwrap();

        assert!(!events.is_empty());
        for event in &events {
            assert!(event.pass.aos >= horizon.start);
            assert!(event.pass.los <= horizon.end());
        }
    }

    #[test]
    fn silent_satellite_terminates_with_no_events() {
        let propagator = Profile::new(|_| -10.0);
        let station = kyutech();
        let driver = Driver::new(&station, &propagator, PeakSearch::Greedy);
        let mut op = operation(0.0, &["a"]);

        let horizon = Horizon::new(base(), Duration::days(3));
        assert!(driver.plan(&mut op, &iss(), &horizon).unwrap().is_empty());
        assert_eq!(op.operators.queue().count(), 1);
    }

    #[test]
    fn never_setting_satellite_terminates_with_no_events() {
        let propagator = Profile::new(|_| 35.0);
        let station = kyutech();
        let driver = Driver::new(&station, &propagator, PeakSearch::Greedy);
        let mut op = operation(0.0, &["a"]);

        let horizon = Horizon::new(base(), Duration::hours(6));
        assert!(driver.plan(&mut op, &iss(), &horizon).unwrap().is_empty());
    }

    #[test]
    fn run_reports_submits_and_skips_missing_satellites() {
        let propagator = Profile::new(|t| periodic(t, PERIOD, 120, 420, 720, 45.0));
        let station = kyutech();
        let driver = Driver::new(&station, &propagator, PeakSearch::Greedy);

        let mut missing = operation(10.0, &["x"]);
        missing.name = "futaba".to_string();
        missing.satellite = "FUTABA".to_string();
        let mut ops = vec![missing, operation(10.0, &["a", "b"])];

        let sink = Recording::default();
        let submitted = sink.submitted.clone();
        let mut calendar = publisher(sink);
        let mut report = TableReport::new(Vec::new(), LocalZone::utc());

        let horizon = Horizon::new(base(), Duration::seconds(2 * PERIOD));
        let summary = driver.run(&mut ops, &catalog(), &horizon, Some(&mut calendar), &mut report);

        assert_eq!(summary.skipped, ["futaba"]);
        assert_eq!(summary.scheduled, 2);
        assert_eq!(summary.submitted, 2);
        assert_eq!(summary.auth_failure, None);

        let submitted = submitted.borrow();
        assert_eq!(submitted[0].0, "ops@group.calendar.google.com");
        assert_eq!(submitted[0].1.summary, "KTN 45.0°");
        assert_eq!(submitted[1].1.attendee(), Some("b"));

        let text = String::from_utf8(report.into_inner()).unwrap();
        assert!(text.contains("# kitsune (ISS (ZARYA))"));
        assert!(!text.contains("futaba"));
        assert_eq!(text.lines().filter(|l| l.ends_with(", a")).count(), 1);
    }

    #[test]
    fn unstaffed_pass_is_reported_without_attendee() {
        let propagator = Profile::new(|t| triangle(t, 120, 420, 720, 45.0));
        let station = kyutech();
        let driver = Driver::new(&station, &propagator, PeakSearch::Greedy);
        let mut ops = vec![operation(10.0, &[])];

        let sink = Recording::default();
        let submitted = sink.submitted.clone();
        let mut calendar = publisher(sink);
        let mut report = TableReport::new(Vec::new(), LocalZone::utc());

        let horizon = Horizon::new(base(), Duration::hours(1));
        let summary = driver.run(&mut ops, &catalog(), &horizon, Some(&mut calendar), &mut report);

        assert_eq!(summary.scheduled, 1);
        assert_eq!(submitted.borrow()[0].1.attendee(), None);
        let text = String::from_utf8(report.into_inner()).unwrap();
        assert!(text
            .lines()
            .any(|l| l.starts_with("1, 2024/05/13, 00:02:00, 00:12:00, 0:10:00, 45.00, none")));
    }

    #[test]
    fn submission_failure_does_not_stop_the_run() {
        let propagator = Profile::new(|t| periodic(t, PERIOD, 120, 420, 720, 45.0));
        let station = kyutech();
        let driver = Driver::new(&station, &propagator, PeakSearch::Greedy);
        let mut ops = vec![operation(10.0, &["a"])];

        let sink = Recording {
            fail_on: Some(0),
            ..Recording::default()
        };
        let submitted = sink.submitted.clone();
        let mut calendar = publisher(sink);
        let mut report = TableReport::new(Vec::new(), LocalZone::utc());

        let horizon = Horizon::new(base(), Duration::seconds(3 * PERIOD));
        let summary = driver.run(&mut ops, &catalog(), &horizon, Some(&mut calendar), &mut report);

        assert_eq!(summary.scheduled, 3);
        assert_eq!(summary.submission_failures, 1);
        assert_eq!(summary.submitted, 2);
        assert_eq!(submitted.borrow().len(), 3);
    }

    #[test]
    fn auth_failure_stops_submission_but_not_reporting() {
        let propagator = Profile::new(|t| periodic(t, PERIOD, 120, 420, 720, 45.0));
        let station = kyutech();
        let driver = Driver::new(&station, &propagator, PeakSearch::Greedy);
        let mut second = operation(10.0, &["b"]);
        second.name = "birds5".to_string();
        let mut ops = vec![operation(10.0, &["a"]), second];

        let sink = Recording {
            auth_fail_on: Some(1),
            ..Recording::default()
        };
        let submitted = sink.submitted.clone();
        let mut calendar = publisher(sink);
        let mut report = TableReport::new(Vec::new(), LocalZone::utc());

        let horizon = Horizon::new(base(), Duration::seconds(3 * PERIOD));
        let summary = driver.run(&mut ops, &catalog(), &horizon, Some(&mut calendar), &mut report);

        assert_eq!(summary.scheduled, 6);
        assert_eq!(summary.submitted, 1);
        assert!(summary.auth_failure.is_some());
        assert_eq!(submitted.borrow().len(), 1);

        let text = String::from_utf8(report.into_inner()).unwrap();
        assert!(text.contains("# birds5"));
    }

    #[test]
    fn propagation_failure_skips_only_that_operation() {
        let propagator = FailsOnce {
            inner: Profile::new(|t| periodic(t, PERIOD, 120, 420, 720, 45.0)),
            failed: Cell::new(false),
        };
        let station = kyutech();
        let driver = Driver::new(&station, &propagator, PeakSearch::Greedy);
        let mut second = operation(10.0, &["a", "b"]);
        second.name = "birds5".to_string();
        let mut ops = vec![operation(10.0, &["x"]), second];

        let sink = Recording::default();
        let submitted = sink.submitted.clone();
        let mut calendar = publisher(sink);
        let mut report = TableReport::new(Vec::new(), LocalZone::utc());

        let horizon = Horizon::new(base(), Duration::seconds(2 * PERIOD));
        let summary = driver.run(&mut ops, &catalog(), &horizon, Some(&mut calendar), &mut report);

        assert_eq!(summary.skipped, ["kitsune"]);
        assert_eq!(summary.scheduled, 2);
        assert_eq!(summary.submitted, 2);
        assert_eq!(summary.auth_failure, None);
        assert_eq!(submitted.borrow()[0].1.attendee(), Some("a"));
        // The skipped operation never touched its rotation.
        assert_eq!(ops[0].operators.queue().next().map(Operator::as_str), Some("x"));

        let text = String::from_utf8(report.into_inner()).unwrap();
        assert!(!text.contains("# kitsune"));
        assert!(text.contains("# birds5"));
    }

    #[test]
    fn dry_run_submits_nothing() {
        let propagator = Profile::new(|t| triangle(t, 120, 420, 720, 45.0));
        let station = kyutech();
        let driver = Driver::new(&station, &propagator, PeakSearch::Greedy);
        let mut ops = vec![operation(10.0, &["a"])];
        let mut report = TableReport::new(Vec::new(), LocalZone::utc());

        let horizon = Horizon::new(base(), Duration::hours(1));
        let summary = driver.run(&mut ops, &catalog(), &horizon, None, &mut report);

        assert_eq!(summary.scheduled, 1);
        assert_eq!(summary.submitted, 0);
    }
}
