pub mod analytics;
pub mod apps;
pub mod beta;
pub mod bundles;
pub mod devices;
pub mod users;
