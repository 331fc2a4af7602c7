//! Backend access for the UI.
//!
//! The event loop never awaits the network. It pushes a [`types::Request`] onto
//! an unbounded channel; [`worker::worker_loop`] runs each one on its own task
//! and posts the matching [`types::Response`] back as `AppEvent::Backend`.
pub mod types;
pub mod worker;
