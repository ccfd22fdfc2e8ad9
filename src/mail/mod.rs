//! # Outgoing Mail
//!
//! The account lifecycle hands fully composed messages to a [`Mailer`] and moves
//! on. Delivery happens elsewhere; a mailer never blocks the caller and never
//! reports delivery failures back.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::MailConfig;

/// Template names used by the account lifecycle.
pub mod templates {
    pub const CONFIRM: &str = "auth/email/confirm";
    pub const RESET_PASSWORD: &str = "auth/email/reset_password";
    pub const CHANGE_EMAIL: &str = "auth/email/change_email";
}

/// A message ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub template: String,
    pub context: Value,
}

pub trait Mailer: Send + Sync {
    /// Hand off a message. Returns immediately.
    fn send(&self, to: &str, subject: &str, template: &str, context: Value);
}

fn compose(
    config: &MailConfig,
    to: &str,
    subject: &str,
    template: &str,
    context: Value,
) -> OutgoingMessage {
    OutgoingMessage {
        from: config.sender.clone(),
        to: to.to_string(),
        subject: format!("{}{}", config.subject_prefix, subject),
        template: template.to_string(),
        context,
    }
}

/// Logs each message instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct TracingMailer {
    config: MailConfig,
}

impl TracingMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

impl Mailer for TracingMailer {
    fn send(&self, to: &str, subject: &str, template: &str, context: Value) {
        let message = compose(&self.config, to, subject, template, context);
        info!(
            to = %message.to,
            subject = %message.subject,
            template = %message.template,
            "Outgoing mail"
        );
    }
}

/// Queues messages on an unbounded channel for a delivery worker.
#[derive(Debug, Clone)]
pub struct ChannelMailer {
    config: MailConfig,
    sender: mpsc::UnboundedSender<OutgoingMessage>,
}

impl ChannelMailer {
    pub fn new(config: MailConfig) -> (Self, mpsc::UnboundedReceiver<OutgoingMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { config, sender }, receiver)
    }
}

impl Mailer for ChannelMailer {
    fn send(&self, to: &str, subject: &str, template: &str, context: Value) {
        let message = compose(&self.config, to, subject, template, context);
        if let Err(err) = self.sender.send(message) {
            warn!(to = %err.0.to, "Mail delivery worker has gone away; message dropped");
        }
    }
}
