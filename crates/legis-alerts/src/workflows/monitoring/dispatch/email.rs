use std::time::Duration;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use tracing::{debug, warn};

use super::message::Branding;
use super::render::{render_email_html, render_plain};
use super::{Channel, ChannelError, ChannelKind, Message};
use crate::config::EmailConfig;

/// Consolidated channel: STARTTLS SMTP with plain-text and HTML alternatives.
pub struct EmailChannel {
    transport: SmtpTransport,
    timeout: Duration,
    from: Mailbox,
    recipients: Vec<Mailbox>,
    branding: Branding,
}

impl EmailChannel {
    /// `None` when the channel is disabled, sender credentials are missing,
    /// or no recipient address is valid. Invalid recipients are skipped.
    pub fn from_config(
        config: &EmailConfig,
        branding: Branding,
        timeout: Duration,
    ) -> Result<Option<Self>, ChannelError> {
        if !config.is_complete() {
            return Ok(None);
        }
        let (Some(sender), Some(password)) = (config.sender.as_deref(), config.password.as_deref())
        else {
            return Ok(None);
        };

        let from = parse_mailbox(&format!("{} <{sender}>", branding.name))
            .or_else(|_| parse_mailbox(sender))?;
        let recipients: Vec<Mailbox> = config
            .recipients
            .iter()
            .filter_map(|address| match parse_mailbox(address) {
                Ok(mailbox) => Some(mailbox),
                Err(error) => {
                    warn!(%error, "skipping e-mail recipient");
                    None
                }
            })
            .collect();
        if recipients.is_empty() {
            warn!("no valid e-mail recipient configured");
            return Ok(None);
        }

        let transport = SmtpTransport::starttls_relay(&config.smtp_server)
            .map_err(|error| ChannelError::Smtp(error.to_string()))?
            .port(config.smtp_port)
            .timeout(Some(timeout))
            .credentials(Credentials::new(sender.to_string(), password.to_string()))
            .build();

        Ok(Some(Self {
            transport,
            timeout,
            from,
            recipients,
            branding,
        }))
    }

    fn build_email(&self, message: &Message) -> Result<lettre::Message, ChannelError> {
        let mut builder = lettre::Message::builder()
            .from(self.from.clone())
            .subject(message.subject.clone());
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        let mut plain = render_plain(message);
        if let Some(panel_url) = &self.branding.panel_url {
            plain.push_str(&format!("\n\n---\nPainel: {panel_url}"));
        }
        let html = render_email_html(message, &self.branding);

        builder
            .multipart(MultiPart::alternative_plain_html(plain, html))
            .map_err(|error| ChannelError::Build(error.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, ChannelError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|error| ChannelError::Address {
            address: address.to_string(),
            message: error.to_string(),
        })
}

#[async_trait::async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Consolidated
    }

    async fn deliver(&self, message: &Message) -> Result<(), ChannelError> {
        let email = self.build_email(message)?;
        debug!(
            recipients = self.recipients.len(),
            timeout_secs = self.timeout.as_secs(),
            "sending e-mail"
        );
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|error| ChannelError::Smtp(error.to_string()))?
            .map_err(|error| ChannelError::Smtp(error.to_string()))?;
        Ok(())
    }
}
