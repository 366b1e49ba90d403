use std::sync::Arc;

use crate::clients::{BillingProvider, ContentGenerator, OpenAiClient, StripeClient};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, ContentService, ImageService, SeaOrmAuthService, SeaOrmContentService,
    SeaOrmImageService, SeaOrmSubscriptionService, SeaOrmUsageService, SubscriptionService,
    UsageService,
};

/// External collaborators the services talk to.
#[derive(Clone)]
pub struct Providers {
    pub generator: Arc<dyn ContentGenerator>,
    pub billing: Arc<dyn BillingProvider>,
}

impl Providers {
    /// HTTP clients for the configured generation and billing providers.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            generator: Arc::new(OpenAiClient::new(&config.generation)?),
            billing: Arc::new(StripeClient::new(&config.billing)?),
        })
    }
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub content_service: Arc<dyn ContentService>,

    pub image_service: Arc<dyn ImageService>,

    pub subscription_service: Arc<dyn SubscriptionService>,

    pub usage_service: Arc<dyn UsageService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let providers = Providers::from_config(&config)?;
        Self::with_providers(config, providers).await
    }

    pub async fn with_providers(config: Config, providers: Providers) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::from_parts(config, store, providers))
    }

    /// Wires the services over an already opened store.
    #[must_use]
    pub fn from_parts(config: Config, store: Store, providers: Providers) -> Self {
        let generation = Arc::new(config.generation.clone());
        let billing = Arc::new(config.billing.clone());
        let security = Arc::new(config.security.clone());

        let auth_service = Arc::new(SeaOrmAuthService::new(store.clone(), security))
            as Arc<dyn AuthService + Send + Sync + 'static>;

        let content_service = Arc::new(SeaOrmContentService::new(
            store.clone(),
            providers.generator.clone(),
            generation.clone(),
        )) as Arc<dyn ContentService + Send + Sync + 'static>;

        let image_service = Arc::new(SeaOrmImageService::new(
            store.clone(),
            providers.generator,
            generation,
        )) as Arc<dyn ImageService + Send + Sync + 'static>;

        let subscription_service = Arc::new(SeaOrmSubscriptionService::new(
            store.clone(),
            providers.billing,
            billing,
            &config.server.public_base_url,
        )) as Arc<dyn SubscriptionService + Send + Sync + 'static>;

        let usage_service = Arc::new(SeaOrmUsageService::new(store.clone()))
            as Arc<dyn UsageService + Send + Sync + 'static>;

        Self {
            config: Arc::new(config),
            store,
            auth_service,
            content_service,
            image_service,
            subscription_service,
            usage_service,
        }
    }
}
