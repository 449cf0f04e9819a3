//! HTTP surface: JSON endpoints over the schedule index and the latest
//! snapshot, plus the websocket push stream.

pub mod routes;
pub mod ws;
