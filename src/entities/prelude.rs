pub use super::api_keys::Entity as ApiKeys;
pub use super::brand_components::Entity as BrandComponents;
pub use super::email_logs::Entity as EmailLogs;
pub use super::email_templates::Entity as EmailTemplates;
pub use super::events::Entity as Events;
pub use super::integrations::Entity as Integrations;
pub use super::organizations::Entity as Organizations;
pub use super::platform_mailer::Entity as PlatformMailer;
pub use super::user_tokens::Entity as UserTokens;
pub use super::users::Entity as Users;
