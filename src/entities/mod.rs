pub mod prelude;

pub mod api_keys;
pub mod brand_components;
pub mod email_logs;
pub mod email_templates;
pub mod events;
pub mod integrations;
pub mod organizations;
pub mod platform_mailer;
pub mod user_tokens;
pub mod users;
