//! Envoi du message récapitulatif vers un webhook de messagerie

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

/// Corps attendu par les webhooks entrants (Mattermost, Slack)
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WebhookPayload<'a> {
    pub text: &'a str,
}

/// Construit le message, ou `None` s'il n'y a rien à envoyer
pub fn build_payload(message: &str) -> Option<WebhookPayload<'_>> {
    let text = message.trim();
    if text.is_empty() {
        None
    } else {
        Some(WebhookPayload { text })
    }
}

/// Poste le message sur le webhook
///
/// Renvoie `false` si rien n'a été envoyé (pas d'URL ou message vide).
pub async fn send_message(webhook_url: Option<&str>, message: &str) -> Result<bool> {
    let Some(url) = webhook_url.filter(|u| !u.is_empty()) else {
        debug!("No webhook configured, digest not sent");
        return Ok(false);
    };
    let Some(payload) = build_payload(message) else {
        debug!("Empty digest, nothing to send");
        return Ok(false);
    };

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    client
        .post(url)
        .json(&payload)
        .send()
        .await
        .context("Failed to post webhook message")?
        .error_for_status()
        .context("Webhook rejected the message")?;

    info!(lines = payload.text.lines().count(), "Digest sent to webhook");
    Ok(true)
}
