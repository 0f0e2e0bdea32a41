//! Notification recipient configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{DomainError, validation_details};
use crate::policy::{Actor, Operation};
use crate::repository::SettingsRepository;

/// Where a recipient entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientSource {
    /// Mirrors a system user's address.
    User,
    /// Added by hand.
    #[default]
    Extra,
}

/// One configured notification address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Recipient {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub source: RecipientSource,
}

fn enabled_by_default() -> bool {
    true
}

impl Recipient {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            enabled: true,
            source: RecipientSource::Extra,
        }
    }
}

/// The singleton notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Global switch for all order notifications.
    pub enabled: bool,
    /// Also notify when an order changes status.
    #[serde(default)]
    pub notify_on_status_change: bool,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            notify_on_status_change: false,
            recipients: Vec::new(),
        }
    }
}

impl NotificationSettings {
    /// Recipients that should receive messages right now.
    pub fn active_recipients(&self) -> impl Iterator<Item = &Recipient> {
        self.recipients
            .iter()
            .filter(move |recipient| self.enabled && recipient.enabled)
    }

    /// Checks every recipient; details are prefixed with the entry index.
    pub fn check(&self) -> Result<(), DomainError> {
        let mut details = Vec::new();
        let mut seen = HashSet::new();

        for (index, recipient) in self.recipients.iter().enumerate() {
            if let Err(errors) = recipient.validate() {
                details.extend(
                    validation_details(&errors)
                        .into_iter()
                        .map(|detail| format!("recipients[{index}].{detail}")),
                );
            }
            if !seen.insert(recipient.email.trim().to_ascii_lowercase()) {
                details.push(format!("recipients[{index}].email: duplicate address"));
            }
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation("Invalid notification settings", details))
        }
    }
}

/// Admin-only access to the notification settings.
pub struct NotificationSettingsService<S: SettingsRepository> {
    settings: S,
}

impl<S: SettingsRepository> NotificationSettingsService<S> {
    pub fn new(settings: S) -> Self {
        Self { settings }
    }

    /// Returns the current settings.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, actor: &Actor) -> Result<NotificationSettings, DomainError> {
        actor.authorize(Operation::ManageNotifications)?;
        Ok(self.settings.notification_settings().await?)
    }

    /// Replaces the settings wholesale.
    #[tracing::instrument(skip(self, settings))]
    pub async fn replace(
        &self,
        actor: &Actor,
        settings: NotificationSettings,
    ) -> Result<NotificationSettings, DomainError> {
        actor.authorize(Operation::ManageNotifications)?;
        settings.check()?;
        self.settings.save_notification_settings(&settings).await?;

        tracing::info!(
            enabled = settings.enabled,
            recipients = settings.recipients.len(),
            "notification settings replaced"
        );
        Ok(settings)
    }
}
