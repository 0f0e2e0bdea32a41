//! Best-effort fan-out to configured recipients.

use std::time::Instant;

use domain::NotificationSettings;
use futures_util::future::join_all;
use serde::Serialize;

use crate::mailer::Mailer;
use crate::message::Message;

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
    /// Recipients configured, enabled or not.
    pub total: usize,
}

/// Sends one message to every enabled recipient.
///
/// Every attempt runs to completion; a failing recipient never stops the
/// others and never surfaces as an error.
pub struct NotificationDispatcher<M: Mailer> {
    mailer: M,
}

impl<M: Mailer> NotificationDispatcher<M> {
    pub fn new(mailer: M) -> Self {
        Self { mailer }
    }

    /// Returns a reference to the underlying mailer.
    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    #[tracing::instrument(skip(self, settings, message), fields(subject = %message.subject))]
    pub async fn dispatch(
        &self,
        settings: &NotificationSettings,
        message: &Message,
    ) -> DispatchSummary {
        let start = Instant::now();

        let attempts = settings.active_recipients().map(|recipient| async move {
            let email = message.to(recipient);
            match self.mailer.send(&email).await {
                Ok(()) => true,
                Err(error) => {
                    tracing::warn!(to = %recipient.email, %error, "notification delivery failed");
                    false
                }
            }
        });
        let outcomes = join_all(attempts).await;

        let sent = outcomes.iter().filter(|delivered| **delivered).count();
        let summary = DispatchSummary {
            sent,
            failed: outcomes.len() - sent,
            total: settings.recipients.len(),
        };

        metrics::counter!("notifications_sent_total").increment(summary.sent as u64);
        metrics::counter!("notifications_failed_total").increment(summary.failed as u64);
        metrics::histogram!("notification_dispatch_seconds").record(start.elapsed().as_secs_f64());

        tracing::info!(
            sent = summary.sent,
            failed = summary.failed,
            total = summary.total,
            "notification dispatched"
        );
        summary
    }
}
