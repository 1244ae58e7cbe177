//! Source code for CineBot: a subscription-gated movie catalog on Telegram,
//! with a small HTTP API for the web panel.

/// Configuration loaded from the environment.
pub mod config;

/// Error taxonomy shared by both surfaces.
pub mod error;

/// Various types used throughout.
pub mod types;

/// The database.
pub mod database;

/// Who is an admin, who is subscribed, and what they may forward.
pub mod gate;

/// Movie catalog with a memoized search.
pub mod catalog;

/// Storage of payment proof screenshots.
pub mod proofs;

/// Outbound messages to Telegram.
pub mod messenger;

/// Payment request lifecycle.
pub mod payments;

/// Periodic warnings about expiring subscriptions.
pub mod expiration;

/// Everything the chat and HTTP surfaces share.
pub mod backend;

/// Per-user chat state that doesn't deserve the database.
mod sessions;

/// Functions that handle events from Telegram.
mod handlers;

/// HTTP API for the web panel.
pub mod web;

/// Entry function that starts the bot.
mod entry;
pub use entry::*;

#[cfg(test)]
mod test_support;
