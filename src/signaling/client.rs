use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::messages::{
    AnswerResponse, AvatarListResponse, AvatarRecord, ChatRequest, NegotiatedAnswer, OfferRequest,
};
use super::transport::SignalingTransport;
use crate::error::SignalingError;
use crate::peer::SessionDescription;
use crate::session::SessionId;

// Relative, so a base URL with a path prefix keeps it
const OFFER_PATH: &str = "offer";
const CHAT_PATH: &str = "human";
const AVATARS_PATH: &str = "api/avatars";

/// JSON-over-HTTP signaling client
pub struct HttpSignaling {
    client: Client,
    base_url: Url,
    slow_offer_warn: Duration,
}

impl HttpSignaling {
    /// Endpoints resolve under `base_url`; a missing trailing slash is added
    /// so `http://host/avatar` posts to `http://host/avatar/offer`.
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        slow_offer_warn: Duration,
    ) -> Result<Self, SignalingError> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            SignalingError::Network(format!("invalid base URL {}: {}", base_url, e))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SignalingError::Network(e.to_string()))?;

        info!("Signaling endpoint: {}", base_url);

        Ok(Self {
            client,
            base_url,
            slow_offer_warn,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SignalingError> {
        self.base_url
            .join(path)
            .map_err(|e| SignalingError::Network(format!("invalid endpoint {}: {}", path, e)))
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SignalingError> {
        let status = response.status();
        if !status.is_success() {
            return Err(SignalingError::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| SignalingError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl SignalingTransport for HttpSignaling {
    async fn exchange(
        &self,
        local: &SessionDescription,
        avatar_id: &str,
    ) -> Result<NegotiatedAnswer, SignalingError> {
        let url = self.endpoint(OFFER_PATH)?;
        let started = Instant::now();

        info!("Sending offer to {} (avatar={})", url, avatar_id);

        let response = self
            .client
            .post(url)
            .json(&OfferRequest::new(local, avatar_id))
            .send()
            .await?;

        let answer: AnswerResponse = Self::read_json(response).await?;

        let elapsed = started.elapsed();
        info!("Offer request took: {}ms", elapsed.as_millis());
        if elapsed > self.slow_offer_warn {
            warn!("Offer request took too long, remote service may be loading the avatar model");
        }

        NegotiatedAnswer::try_from(answer)
    }

    async fn send_chat(&self, session_id: SessionId, text: &str) -> Result<(), SignalingError> {
        let url = self.endpoint(CHAT_PATH)?;

        info!("Sending chat message (session={}): {}", session_id, text);

        let response = self
            .client
            .post(url)
            .json(&ChatRequest::chat(session_id, text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SignalingError::Rejected {
                status: status.as_u16(),
            });
        }

        // The acknowledgement body carries nothing the client acts on
        debug!("Chat message acknowledged ({})", status);
        Ok(())
    }

    async fn fetch_avatars(&self) -> Result<Vec<AvatarRecord>, SignalingError> {
        let url = self.endpoint(AVATARS_PATH)?;
        let response = self.client.get(url).send().await?;
        let list: AvatarListResponse = Self::read_json(response).await?;

        if list.code != 0 {
            return Err(SignalingError::MalformedResponse(format!(
                "avatar list returned code {}",
                list.code
            )));
        }

        Ok(list.data.unwrap_or_default())
    }
}
