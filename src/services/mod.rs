pub mod auth_service;
pub mod feed_service;
pub mod file_service;
pub mod mailer;
pub mod portal_service;
pub mod usage_service;

pub use auth_service::{AuthError, AuthService, Session};
pub use feed_service::FeedService;
pub use file_service::FileService;
pub use mailer::{LogMailer, Mailer};
pub use portal_service::{PortalError, PortalService};
pub use usage_service::{UsageError, UsageService, UsageStore};
