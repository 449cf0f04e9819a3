pub mod api;
pub mod config;
pub mod decode;
pub mod error;
pub mod estimate;
pub mod fetch;
pub mod poller;
pub mod schedule;
pub mod snapshot;
