//! ============================================================================
//! Storage Module - gateway client and encryption envelope
//! ============================================================================
//! Request/response plumbing against the content-addressed gateway plus the
//! encrypt-then-store envelope for callers who keep content private.
//! ============================================================================

mod client;
pub mod envelope;

pub use client::StorageClient;
