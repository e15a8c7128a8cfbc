//! Backend for the Avalance marketing site.
//!
//! Contact and pricing-request forms are validated, persisted to MongoDB
//! (server deployment) or etcd (edge deployment) and announced to an
//! administrator by email. Admin routes list and triage the submissions.

pub mod config;
pub mod core;
pub mod handler;
pub mod logging;
pub mod model;
pub mod notify;
pub mod service;
pub mod store;
pub mod utils;
