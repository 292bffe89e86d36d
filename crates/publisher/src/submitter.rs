//! Price update submission to the node's CLI webserver

use std::time::Duration;

use async_trait::async_trait;
use num_rational::BigRational;
use tracing::{debug, info};

use pixel_pricer_core::{NodeRole, PublishError, PublishResult};

/// Something that accepts a new price per pixel, in wei
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, price_per_unit: &BigRational) -> PublishResult<()>;
}

/// Publisher configuration
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Base URL of the node, e.g. `http://127.0.0.1:7935`
    pub node_url: String,
    pub is_orchestrator_path: String,
    pub orchestrator_path: String,
    pub broadcaster_path: String,
    pub numerator_field: String,
    pub denominator_field: String,
    pub request_timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            node_url: "http://127.0.0.1:7935".to_string(),
            is_orchestrator_path: "/IsOrchestrator".to_string(),
            orchestrator_path: "/setOrchestratorPrice".to_string(),
            broadcaster_path: "/setBroadcastMaxPrice".to_string(),
            numerator_field: "pricePerUnit".to_string(),
            denominator_field: "pixelsPerUnit".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl PublisherConfig {
    pub fn with_node_url(mut self, node_url: impl Into<String>) -> Self {
        self.node_url = node_url.into();
        self
    }
}

/// Publishes to a single node whose role is fixed at construction
#[derive(Debug, Clone)]
pub struct NodePublisher {
    config: PublisherConfig,
    http: reqwest::Client,
    role: NodeRole,
}

impl NodePublisher {
    /// Discover the node's role and build a publisher for it.
    ///
    /// Fails when the node is unreachable or does not answer with a JSON
    /// boolean; there is no sensible endpoint to fall back to.
    pub async fn connect(config: PublisherConfig, http: reqwest::Client) -> PublishResult<Self> {
        let url = format!("{}{}", config.node_url, config.is_orchestrator_path);
        let body = send(&url, http.get(&url).timeout(config.request_timeout)).await?;

        let is_orch: bool = serde_json::from_str(body.trim())
            .map_err(|e| PublishError::InvalidRole(format!("{e}: {body:?}")))?;
        let role = NodeRole::from_is_orchestrator(is_orch);
        info!("Node at {} is a {}", config.node_url, role);

        Ok(Self { config, http, role })
    }

    /// Build a publisher for an already known role
    pub fn with_role(config: PublisherConfig, http: reqwest::Client, role: NodeRole) -> Self {
        Self { config, http, role }
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Price endpoint for the discovered role
    pub fn endpoint(&self) -> String {
        let path = match self.role {
            NodeRole::Orchestrator => &self.config.orchestrator_path,
            NodeRole::Broadcaster => &self.config.broadcaster_path,
        };
        format!("{}{}", self.config.node_url, path)
    }
}

#[async_trait]
impl Publisher for NodePublisher {
    async fn publish(&self, price_per_unit: &BigRational) -> PublishResult<()> {
        let url = self.endpoint();
        let numer = price_per_unit.numer().to_string();
        let denom = price_per_unit.denom().to_string();

        info!(
            "Sending price per pixel update {}={} {}={}",
            self.config.numerator_field, numer, self.config.denominator_field, denom
        );

        let form = [
            (self.config.numerator_field.as_str(), numer),
            (self.config.denominator_field.as_str(), denom),
        ];
        let request = self
            .http
            .post(&url)
            .form(&form)
            .timeout(self.config.request_timeout);

        send(&url, request).await?;
        Ok(())
    }
}

/// Send a request, treating any non-2xx status as failure. The body is
/// returned as-is; an empty body is not an error.
async fn send(url: &str, request: reqwest::RequestBuilder) -> PublishResult<String> {
    let transport = |e: reqwest::Error| PublishError::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    };

    let res = request.send().await.map_err(transport)?;
    let status = res.status();
    if !status.is_success() {
        return Err(PublishError::BadStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = res.text().await.map_err(transport)?;
    debug!("{} responded {} ({} bytes)", url, status, body.len());
    Ok(body)
}
