//! Shared wire types for the rust-infer clients.

pub mod chat;
pub mod segmentation;
