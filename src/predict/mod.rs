mod error;
mod fetch;
mod ground_station;
mod pass_finder;
mod propagation;
mod tle_loader;
mod types;

pub use error::PredictError;
pub use fetch::{HttpFetcher, TleFetcher};
pub use ground_station::GroundStation;
pub use pass_finder::{find_pass, search_pass, PeakSearch};
pub use propagation::{Propagator, Sgp4Propagator};
pub use tle_loader::{ElementCatalog, TleCache};
pub use types::{Pass, Satellite};

#[cfg(test)]
pub(crate) mod testing;
