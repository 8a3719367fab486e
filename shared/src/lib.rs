pub mod api;
pub mod clock;
pub mod geo;
pub mod heat;
pub mod occupancy;
pub mod routing;
pub mod trajectory;

pub use api::Granularity;
pub use clock::ViewMode;
pub use geo::LatLng;
pub use heat::{HeatPoint, HeatSource};
pub use occupancy::*;
