pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{resolve_user_id, CurrentUser};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use request_id::{make_span_with_request_id, request_id_middleware, RequestId, REQUEST_ID_HEADER};
