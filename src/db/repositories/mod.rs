pub mod api_key;
pub mod brand_component;
pub mod email_log;
pub mod event;
pub mod integration;
pub mod organization;
pub mod platform;
pub mod template;
pub mod user;
pub mod user_token;
