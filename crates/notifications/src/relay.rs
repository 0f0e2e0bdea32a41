//! Outbox relay: turns recorded order events into notifications.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use domain::{
    Aggregate, Clock, NotificationSettings, Order, OrderEvent, OrderRepository, OutboxRepository,
    RecordedEvent, SettingsRepository, SystemClock,
};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

use crate::dispatcher::NotificationDispatcher;
use crate::error::{NotificationError, Result};
use crate::mailer::Mailer;
use crate::message::Message;

/// Polling parameters for the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    pub poll_interval: Duration,
    /// Maximum events handled per tick.
    pub batch_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            batch_size: 50,
        }
    }
}

/// Drains unpublished order events and dispatches notifications.
///
/// `OrderPlaced` always notifies; `StatusChanged` only when the settings
/// ask for it. Other events are marked published without sending
/// anything. An event whose message cannot be built stays unpublished and
/// is retried on the next tick. Per-recipient delivery failures are not
/// retried.
pub struct OutboxRelay<R, S, M>
where
    R: OrderRepository + OutboxRepository,
    S: SettingsRepository,
    M: Mailer,
{
    orders: R,
    settings: S,
    dispatcher: NotificationDispatcher<M>,
    config: RelayConfig,
    wake: Arc<Notify>,
    clock: Arc<dyn Clock>,
}

impl<R, S, M> OutboxRelay<R, S, M>
where
    R: OrderRepository + OutboxRepository,
    S: SettingsRepository,
    M: Mailer,
{
    pub fn new(
        orders: R,
        settings: S,
        dispatcher: NotificationDispatcher<M>,
        config: RelayConfig,
    ) -> Self {
        Self {
            orders,
            settings,
            dispatcher,
            config,
            wake: Arc::new(Notify::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source used for `published_at`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Handle that triggers a tick before the poll interval elapses.
    pub fn waker(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    /// Handles one batch and returns the number of events published.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> Result<usize> {
        let events = self.orders.unpublished(self.config.batch_size).await?;
        if events.is_empty() {
            return Ok(0);
        }
        let settings = self.settings.notification_settings().await?;

        let mut published = Vec::with_capacity(events.len());
        for event in &events {
            match self.handle(event, &settings).await {
                Ok(()) => published.push(event.event_id),
                Err(error) => tracing::warn!(
                    event_id = %event.event_id,
                    order_id = %event.order_id,
                    event_type = %event.event_type,
                    %error,
                    "event left unpublished"
                ),
            }
        }

        if !published.is_empty() {
            self.orders
                .mark_published(&published, self.clock.now())
                .await?;
            metrics::counter!("outbox_events_published_total").increment(published.len() as u64);
        }
        Ok(published.len())
    }

    /// Polls until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "outbox relay started"
        );
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {}
                () = self.wake.notified() => {}
            }

            if let Err(error) = self.run_once().await {
                tracing::warn!(%error, "outbox relay tick failed");
            }
        }
        tracing::info!("outbox relay stopped");
    }

    async fn handle(&self, event: &RecordedEvent, settings: &NotificationSettings) -> Result<()> {
        if settings.active_recipients().next().is_none() {
            return Ok(());
        }

        let message = match &event.payload {
            OrderEvent::OrderPlaced(data) => {
                // Render the order as placed, not as later merges left it.
                let mut order = Order::default();
                order.apply(OrderEvent::OrderPlaced(data.clone()));
                Message::order_placed(&order)
            }
            OrderEvent::StatusChanged(data) if settings.notify_on_status_change => {
                let order = self
                    .orders
                    .get(event.order_id)
                    .await?
                    .ok_or(NotificationError::OrderMissing(event.order_id))?;
                Message::status_changed(&order, data.from, data.to)
            }
            _ => return Ok(()),
        };

        self.dispatcher.dispatch(settings, &message).await;
        Ok(())
    }
}
