//! Shared types, error definitions, and utilities used across all porter crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, FromMessage, Result},
    types::{ChatType, ParticipantId},
};
