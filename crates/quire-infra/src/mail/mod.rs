//! Outbound mail channels - console, HTTP relay and an in-memory outbox.

mod console;
mod memory;

#[cfg(feature = "webhook-mail")]
mod webhook;

pub use console::ConsoleMailer;
pub use memory::InMemoryMailer;

#[cfg(feature = "webhook-mail")]
pub use webhook::WebhookMailer;
