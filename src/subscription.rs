use crate::sources::AdapterRegistry;
use crate::storage::{NewSource, SourceStore, SubscriptionStore};
use crate::types::{Result, Source, SourceType, Subscription};
use std::sync::Arc;
use tracing::info;
use url::Url;
use uuid::Uuid;

/// What a caller provides when subscribing. Type and name are optional; the
/// adapter registry fills them in from the URL.
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    pub url: String,
    pub source_type: Option<SourceType>,
    pub name: Option<String>,
}

/// Owns the (user, source) relation: resolves which adapter a URL belongs
/// to, creates the source if it is unknown, and attaches the user to it.
pub struct SubscriptionService {
    sources: Arc<dyn SourceStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    registry: Arc<AdapterRegistry>,
}

impl SubscriptionService {
    pub fn new(
        sources: Arc<dyn SourceStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        registry: Arc<AdapterRegistry>,
    ) -> Self {
        Self {
            sources,
            subscriptions,
            registry,
        }
    }

    /// Subscribe a user to a URL. Subscribing twice to the same source is a
    /// no-op returning the existing subscription.
    pub async fn subscribe(
        &self,
        user_id: Uuid,
        request: SubscribeRequest,
    ) -> Result<(Subscription, Source)> {
        let (source_type, derived_name) = self.resolve(&request)?;
        let name = request.name.unwrap_or(derived_name);

        let source = self
            .sources
            .create(NewSource {
                name,
                source_type,
                resource_url: request.url,
            })
            .await?;

        let subscription = self.subscriptions.subscribe(user_id, source.id).await?;
        info!(
            "User {} subscribed to {} ({})",
            user_id, source.name, source.source_type
        );
        Ok((subscription, source))
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Subscription>> {
        self.subscriptions.list_for_user(user_id).await
    }

    /// Resolve source type and default name for a request. Email sources are
    /// push-ingested and carry their address as the locator, so they skip
    /// URL validation and adapter naming.
    fn resolve(&self, request: &SubscribeRequest) -> Result<(SourceType, String)> {
        if request.source_type == Some(SourceType::Email) {
            return Ok((SourceType::Email, request.url.clone()));
        }

        Url::parse(&request.url)?;

        match request.source_type {
            Some(source_type) => {
                let adapter = self
                    .registry
                    .for_type(source_type)
                    .ok_or(crate::types::FeedJamError::AdapterNotFound(source_type))?;
                Ok((source_type, adapter.source_name(&request.url)))
            }
            None => {
                let adapter = self.registry.detect(&request.url);
                Ok((adapter.source_type(), adapter.source_name(&request.url)))
            }
        }
    }
}
