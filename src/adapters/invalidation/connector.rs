//! reqwest-based relay stream connector.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL};
use secrecy::{ExposeSecret, SecretString};

use super::sse::SseDecoder;
use crate::domain::events::RelayMessage;
use crate::ports::{ClientError, RelayStream, StreamConnector};

/// Opens `GET <url>` as an event stream, resuming with `Last-Event-ID`.
pub struct HttpStreamConnector {
    client: reqwest::Client,
    url: String,
    token: Option<SecretString>,
}

impl HttpStreamConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token: None,
        }
    }

    /// Sends `Authorization: Bearer <token>` on every connect.
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl StreamConnector for HttpStreamConnector {
    async fn connect(&self, last_cursor: Option<i64>) -> Result<RelayStream, ClientError> {
        let mut request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(cursor) = last_cursor {
            request = request.header("Last-Event-ID", cursor.to_string());
        }
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Connect(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Rejected(status.as_u16()));
        }

        let mut decoder = SseDecoder::new();
        let messages = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder
                    .push(&bytes)
                    .into_iter()
                    .filter_map(|frame| RelayMessage::decode(&frame.event, &frame.data))
                    .map(Ok)
                    .collect::<Vec<_>>(),
                Err(e) => vec![Err(ClientError::Stream(e.to_string()))],
            })
            .flat_map(stream::iter);

        Ok(messages.boxed())
    }
}
