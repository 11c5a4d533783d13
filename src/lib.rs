//! Dineboard: admin client for a restaurant point-of-sale backend.
//!
//! Library half of the `dineboard` binary. `net` talks to the backend,
//! `services` holds the pure order math, filtering, reporting and bill
//! printing, `session` keeps the bearer token between runs.

pub mod config;
pub mod net;
pub mod services;
pub mod session;
