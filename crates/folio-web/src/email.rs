use std::time::Duration;

use async_trait::async_trait;
use folio_core::{ContactMessage, CoreError, CoreResult, Mailer};
use serde::Serialize;

use crate::config::EmailConfig;

/// Sends contact messages through the EmailJS REST API.
pub struct EmailJsMailer {
    client: reqwest::Client,
    config: EmailConfig,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams<'a>,
}

/// Field names match the template variables of the contact form.
#[derive(Debug, Serialize)]
struct TemplateParams<'a> {
    user_name: &'a str,
    user_email: &'a str,
    message: &'a str,
}

impl<'a> SendRequest<'a> {
    fn new(config: &'a EmailConfig, message: &'a ContactMessage) -> Self {
        Self {
            service_id: &config.service_id,
            template_id: &config.template_id,
            user_id: &config.public_key,
            template_params: TemplateParams {
                user_name: message.name(),
                user_email: message.email(),
                message: message.message(),
            },
        }
    }
}

impl EmailJsMailer {
    pub fn new(config: EmailConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for EmailJsMailer {
    async fn send(&self, message: &ContactMessage) -> CoreResult<()> {
        if !self.config.is_configured() {
            return Err(CoreError::Delivery("EmailJS credentials are not configured".to_string()));
        }

        let body = SendRequest::new(&self.config, message);
        let response = self
            .client
            .post(&self.config.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(CoreError::Delivery(format!("EmailJS returned {status}: {detail}")));
        }

        tracing::info!("Contact message delivered via EmailJS");
        Ok(())
    }
}
