//! # gardi
//!
//! Request admission and credential issuance: sliding-window rate limiting
//! plus password hashing and signed, expiring bearer tokens, composed at the
//! request boundary of an axum service.

pub mod cli;
pub mod gardi;
