//! Channel fan-out with quiet-hours suppression.

mod email;
pub mod message;
pub mod render;
mod telegram;

pub use email::EmailChannel;
pub use message::{Block, Branding, Link, Message, Section};
pub use telegram::TelegramChannel;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::domain::AlertLevel;
use super::profile::QuietHours;

/// Real-time channels receive every event; consolidated channels only
/// matches and the end-of-day summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    RealTime,
    Consolidated,
}

/// Which channel kinds a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    RealTimeOnly,
    AllChannels,
}

impl Audience {
    fn includes(self, kind: ChannelKind) -> bool {
        match self {
            Audience::RealTimeOnly => kind == ChannelKind::RealTime,
            Audience::AllChannels => true,
        }
    }
}

#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> ChannelKind;
    async fn deliver(&self, message: &Message) -> Result<(), ChannelError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("http transport failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid address '{address}': {message}")]
    Address { address: String, message: String },
    #[error("unable to build e-mail: {0}")]
    Build(String),
    #[error("smtp delivery failed: {0}")]
    Smtp(String),
}

/// Source of "now" in the operating timezone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Tz>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Tz>) {
        *self
            .now
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        *self
            .now
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    /// Held back by quiet hours.
    Suppressed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelOutcome {
    pub channel: String,
    pub kind: ChannelKind,
    pub outcome: DeliveryOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchReport {
    /// At least one channel took the message.
    pub fn succeeded(&self) -> bool {
        self.outcomes
            .iter()
            .any(|entry| entry.outcome == DeliveryOutcome::Delivered)
    }

    pub fn outcome_for(&self, channel: &str) -> Option<&DeliveryOutcome> {
        self.outcomes
            .iter()
            .find(|entry| entry.channel == channel)
            .map(|entry| &entry.outcome)
    }
}

pub struct Dispatcher {
    channels: Vec<Box<dyn Channel>>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Box<dyn Channel>>, clock: Arc<dyn Clock>) -> Self {
        Self { channels, clock }
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|channel| channel.name()).collect()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Deliver `message` to every channel in `audience`. Channels fail
    /// independently; quiet hours only hold back real-time channels below
    /// [`AlertLevel::Critical`].
    pub async fn dispatch(
        &self,
        audience: Audience,
        message: &Message,
        level: AlertLevel,
        quiet_hours: Option<&QuietHours>,
    ) -> DispatchReport {
        let hour = self.clock.now().hour();
        let quiet = level < AlertLevel::Critical
            && quiet_hours.map(|window| window.contains(hour)).unwrap_or(false);

        let mut report = DispatchReport::default();
        for channel in self
            .channels
            .iter()
            .filter(|channel| audience.includes(channel.kind()))
        {
            let outcome = if quiet && channel.kind() == ChannelKind::RealTime {
                tracing::info!(channel = channel.name(), %level, hour, "suppressed by quiet hours");
                DeliveryOutcome::Suppressed
            } else {
                match channel.deliver(message).await {
                    Ok(()) => {
                        tracing::info!(channel = channel.name(), %level, subject = %message.subject, "notification delivered");
                        DeliveryOutcome::Delivered
                    }
                    Err(error) => {
                        tracing::warn!(channel = channel.name(), %level, %error, "notification failed");
                        DeliveryOutcome::Failed(error.to_string())
                    }
                }
            };

            report.outcomes.push(ChannelOutcome {
                channel: channel.name().to_string(),
                kind: channel.kind(),
                outcome,
            });
        }

        report
    }
}

/// Writes the plain rendering to the log instead of sending it.
pub struct LogChannel {
    name: String,
    kind: ChannelKind,
}

impl LogChannel {
    pub fn new(name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[async_trait::async_trait]
impl Channel for LogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn deliver(&self, message: &Message) -> Result<(), ChannelError> {
        tracing::info!(channel = %self.name, body = %render::render_plain(message), "dry-run notification");
        Ok(())
    }
}
