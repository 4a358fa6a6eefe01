pub mod crypto;
pub use crypto::{CipherError, CredentialCipher};

pub mod render;
pub use render::{Placeholder, Rendered};

pub mod transport;
pub use transport::{
    EmailTransport, HttpRelayTransport, LogTransport, OutgoingEmail, ProviderCredentials,
    TransportError, build_transport,
};

pub mod dispatch;
pub use dispatch::{
    DeliveryOutcome, DeliveryWorker, DispatchError, SendDispatcher, SendJob, TaskHandle,
    TokioDispatcher,
};

pub mod reconcile;
pub use reconcile::{ABANDONED_ERROR, ReconcileService};

pub mod notify;
pub use notify::{NotifyError, PlatformNotifier};

pub mod promotion;
pub use promotion::PromotionEngine;

pub mod trigger;
pub use trigger::{TriggerAccepted, TriggerError, TriggerService};

pub mod logs;
pub use logs::{LogPage, LogService, SendLogView};

pub mod brand_service;
pub use brand_service::{BrandComponentService, BrandComponentView};

pub mod api_key_service;
pub mod api_key_service_impl;
pub use api_key_service::{ApiKeyError, ApiKeyInfo, ApiKeyService, CreatedApiKey};
pub use api_key_service_impl::SeaOrmApiKeyService;

pub mod catalog_service;
pub mod catalog_service_impl;
pub use catalog_service::{CatalogService, Promoted, ResourceError};
pub use catalog_service_impl::SeaOrmCatalogService;

pub mod account_service;
pub mod account_service_impl;
pub use account_service::{AccountError, AccountService, UserView};
pub use account_service_impl::SeaOrmAccountService;
