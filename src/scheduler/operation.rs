use serde::Serialize;

use crate::predict::Pass;
use crate::scheduler::rotation::{Operator, OperatorRotation};

/// A scheduling unit: one satellite, its threshold and its operator rotation.
#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    /// Catalog key: object name or NORAD id.
    pub satellite: String,
    /// Short satellite name used in event titles.
    pub label: String,
    pub operation_type: String,
    pub description: String,
    pub min_elevation_deg: f64,
    pub calendar_id: Option<String>,
    pub operators: OperatorRotation,
}

impl Operation {
    /// Next operator in the rotation, `None` when nobody is rostered.
    ///
    /// Call once per qualifying pass; a second call skips an operator.
    pub fn assign(&mut self) -> Option<Operator> {
        self.operators.next()
    }

    pub fn qualifies(&self, pass: &Pass) -> bool {
        !pass.is_degenerate() && pass.max_elevation_deg >= self.min_elevation_deg
    }
}

/// A qualifying pass with its assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledEvent {
    /// 1-based position within the operation's run.
    pub sequence: u32,
    pub operation: String,
    pub pass: Pass,
    pub operator: Option<Operator>,
}
