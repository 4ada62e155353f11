//! Port traits at the edges of the domain.

pub mod classifier_port;
pub mod config_port;
pub mod fill_port;
pub mod report_port;
