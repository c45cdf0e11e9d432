pub mod activity;
pub mod file;
pub mod notification;
pub mod plan;
pub mod portal;
pub mod subscription;
pub mod update;
pub mod user;

pub use activity::Activity;
pub use file::PortalFile;
pub use notification::Notification;
pub use plan::Plan;
pub use portal::Portal;
pub use subscription::Subscription;
pub use update::PortalUpdate;
pub use user::User;
