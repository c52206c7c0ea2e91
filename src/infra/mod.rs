//! Infrastructure layer (adapters/implementations).
//!
//! Service seams, the session bus, configuration and the in-process
//! document backend.

pub mod app_config;
pub mod bus;
pub mod local;
pub mod services;
