pub mod auth;
pub mod capability;
pub mod response;
pub mod validated;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use capability::{AnyRole, Authenticated, FreelancerRole};
pub use response::{ApiResponse, ApiResult};
pub use validated::ValidatedJson;
