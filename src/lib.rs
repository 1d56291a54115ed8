pub mod app;
pub mod compare;
pub mod error;
pub mod geocode;
pub mod model;
pub mod render;
pub mod report;
pub mod resample;
pub mod schema;
pub mod view;

pub use app::{dispatch, AppView, ViewRequest};
pub use compare::{ComparisonRequest, ComparisonResult, Scope};
pub use error::DashError;
pub use geocode::{Coordinates, Geocoder, NominatimGeocoder, NullGeocoder};
pub use model::{DataConfig, Licensee, SalesCategory, SalesModel};
pub use report::StatsRequest;
pub use resample::Period;
pub use view::ViewModel;
