pub mod date_range;
pub mod filter;
pub mod geometry;
pub mod model_artifact;
pub mod observation;
pub mod site;
