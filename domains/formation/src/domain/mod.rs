//! Formation domain layer: entities, request state machine, scorer, validation

pub mod commands;
pub mod config;
pub mod entities;
pub mod scoring;
pub mod state;
pub mod validation;
