//! Order notifications.
//!
//! Order writes never send mail themselves. They record events in the
//! outbox; the [`OutboxRelay`] drains those events, renders a message and
//! hands it to the [`NotificationDispatcher`], which fans out to every
//! enabled recipient through a [`Mailer`].

pub mod dispatcher;
pub mod error;
pub mod mailer;
pub mod message;
pub mod relay;

pub use dispatcher::{DispatchSummary, NotificationDispatcher};
pub use error::{NotificationError, Result};
pub use mailer::{Email, EmailConfig, InMemoryMailer, LogMailer, Mailer, SmtpMailer};
pub use message::Message;
pub use relay::{OutboxRelay, RelayConfig};
