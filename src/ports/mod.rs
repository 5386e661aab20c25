//! Port traits: the narrow contracts between the accounting core and the outside.

pub mod config_port;
pub mod persistence_port;
pub mod price_port;
