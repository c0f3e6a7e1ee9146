//! Live session relay over NATS
//!
//! For deployments where a gateway process holds the Live API connection:
//! the setup handshake is a request/reply, audio goes out as
//! [`AudioFrameMessage`]s and server messages come back in Live API JSON.

pub mod client;
pub mod messages;

pub use client::NatsRelayTransport;
pub use messages::AudioFrameMessage;
