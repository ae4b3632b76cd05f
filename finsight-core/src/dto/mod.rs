//! Wire DTOs
//!
//! Shapes exchanged with the dashboard backend: the event union pushed
//! over the live stream and the response returned by the status endpoint.

pub mod event;
pub mod status;
