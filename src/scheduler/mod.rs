mod driver;
mod horizon;
mod operation;
mod rotation;

pub use driver::{Driver, RunSummary};
pub use horizon::Horizon;
pub use operation::{Operation, ScheduledEvent};
pub use rotation::{Operator, OperatorRotation};
