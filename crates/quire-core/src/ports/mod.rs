//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod mail;
mod repository;

pub use mail::{MailError, Mailer, OutgoingMail};
pub use repository::{
    BaseRepository, CommentFilter, CommentRepository, PostRepository, PublishedFilter,
    TagRepository, UserRepository,
};
