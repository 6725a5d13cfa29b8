//! Asynchronous, signed, filtered webhook delivery.

pub mod config;
pub mod publisher;
pub mod signature;

pub use config::WebhookConfig;
pub use publisher::WebhookPublisher;
pub use signature::{sign_payload, signature_header, verify_signature};
