pub mod codec;
pub mod common;
pub mod config;
pub mod curriculum;
pub mod error;
pub mod space;
pub mod strategy;
pub mod study;
pub mod suggest;
pub mod telemetry;
pub mod trial;
pub mod trial_table;

#[cfg(feature = "server")]
pub mod api;
#[cfg(feature = "server")]
pub mod worker;
