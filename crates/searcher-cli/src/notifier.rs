use std::time::Duration;

use reqwest::blocking::{Client, Request};

use crate::credentials::TelegramCredential;
use crate::model::Product;

pub trait Notifier {
    /// Deliver `message`. Delivery is best effort and never reports failure.
    fn notify(&self, message: &str);
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Build a notifier when the credential is active, `None` otherwise.
    pub fn from_credential(
        credential: &TelegramCredential,
        api_base: &str,
        timeout_secs: u64,
    ) -> Result<Option<Self>, reqwest::Error> {
        if !credential.is_active() {
            return Ok(None);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Some(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: credential.token.clone().unwrap_or_default(),
            chat_id: credential.chat_id.clone().unwrap_or_default(),
        }))
    }

    pub fn endpoint(&self) -> String {
        send_message_endpoint(&self.api_base, &self.token)
    }

    /// The `sendMessage` GET carrying `chat_id` and `text` as query parameters.
    pub fn request(&self, message: &str) -> reqwest::Result<Request> {
        self.client
            .get(self.endpoint())
            .query(&[("chat_id", self.chat_id.as_str()), ("text", message)])
            .build()
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, message: &str) {
        let result = self
            .request(message)
            .and_then(|request| self.client.execute(request));

        if let Err(error) = result {
            tracing::debug!(error = %error, "telegram notification failed");
        }
    }
}

pub fn send_message_endpoint(api_base: &str, token: &str) -> String {
    format!("{api_base}/bot{token}/sendMessage")
}

pub fn product_message(query_name: &str, product: &Product) -> String {
    format!(
        "New product discovered\nsearch name: {query_name}\nproduct name: {}\nlocation: {}\nprice: {}\nlink: {}",
        product.title,
        product.location,
        product.price_label(),
        product.link
    )
}
