//! Formation engine integration tests
//!
//! Exercises the engine end to end over the in-memory store: membership,
//! request lifecycle, discovery, registry, invariants and concurrency.

mod common;
mod concurrency;
mod discovery;
mod invariants;
mod membership;
mod registry;
mod requests;
