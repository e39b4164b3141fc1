//! Domain logic for tagtally: image normalization, annotation records,
//! JSON extraction from oracle replies, and frequency tallying.
//!
//! Nothing in this crate talks to the network. The oracle client lives
//! in `tagtally-oracle` and the batch drivers in `tagtally-pipeline`.

pub mod annotation;
pub mod assets;
pub mod config;
pub mod error;
pub mod extract;
pub mod frequency;
pub mod normalize;
pub mod prompt;
