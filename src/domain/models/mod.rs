pub mod auth;
pub mod category;
pub mod communication;
pub mod event;
pub mod job;
pub mod lounge;
pub mod material;
pub mod registration;
pub mod user;

use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;

/// Raised when a TEXT column holds a value outside of a status/role enum.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

pub(crate) fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
