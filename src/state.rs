use anyhow::Context;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::{CREDENTIAL_KEY_ENV, Config};
use crate::db::Store;
use crate::services::{
    AccountService, ApiKeyService, BrandComponentService, CatalogService, CredentialCipher,
    DeliveryWorker, EmailTransport, LogService, PlatformNotifier, ReconcileService,
    SeaOrmAccountService, SeaOrmApiKeyService, SeaOrmCatalogService, SendDispatcher,
    TokioDispatcher, TriggerService, build_transport,
};

/// Resolves the credential cipher from config or `XYNO_CREDENTIAL_KEY`.
pub fn credential_cipher(config: &Config) -> anyhow::Result<CredentialCipher> {
    let key = config.security.resolved_credential_key().with_context(|| {
        format!(
            "No credential key configured: set security.credential_key or {CREDENTIAL_KEY_ENV} (`xyno init` writes one)"
        )
    })?;
    CredentialCipher::from_base64_key(&key).context("Invalid credential key")
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub cipher: CredentialCipher,

    pub account_service: Arc<dyn AccountService>,

    pub api_key_service: Arc<dyn ApiKeyService>,

    pub catalog_service: Arc<dyn CatalogService>,

    pub trigger_service: Arc<TriggerService>,

    pub log_service: Arc<LogService>,

    pub brand_components: Arc<BrandComponentService>,

    pub reconcile: ReconcileService,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let transport = build_transport(&config.delivery)?;
        Self::with_collaborators(config, transport, None).await
    }

    /// Builds the state around an explicit transport and, optionally, a
    /// dispatcher. Without one, sends run on a [`TokioDispatcher`].
    pub async fn with_collaborators(
        config: Config,
        transport: Arc<dyn EmailTransport>,
        dispatcher: Option<Arc<dyn SendDispatcher>>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let cipher = credential_cipher(&config)?;

        let dispatcher = dispatcher.unwrap_or_else(|| {
            let worker = Arc::new(DeliveryWorker::new(
                store.clone(),
                cipher.clone(),
                transport.clone(),
                &config.delivery,
            ));
            Arc::new(TokioDispatcher::new(worker)) as Arc<dyn SendDispatcher>
        });

        let notifier = Arc::new(PlatformNotifier::new(
            store.clone(),
            cipher.clone(),
            transport,
            &config.server.public_url,
        ));

        let account_service = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            config.security.clone(),
            notifier,
        )) as Arc<dyn AccountService>;

        let api_key_service =
            Arc::new(SeaOrmApiKeyService::new(store.clone())) as Arc<dyn ApiKeyService>;

        let catalog_service = Arc::new(SeaOrmCatalogService::new(store.clone(), cipher.clone()))
            as Arc<dyn CatalogService>;

        let trigger_service = Arc::new(TriggerService::new(store.clone(), dispatcher));
        let log_service = Arc::new(LogService::new(store.clone()));
        let brand_components = Arc::new(BrandComponentService::new(store.clone()));
        let reconcile = ReconcileService::new(store.clone(), config.delivery.stale_pending_minutes);

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            cipher,
            account_service,
            api_key_service,
            catalog_service,
            trigger_service,
            log_service,
            brand_components,
            reconcile,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
