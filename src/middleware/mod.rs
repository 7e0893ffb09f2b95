pub mod auth;
pub mod request_id;

pub use auth::AdminUser;
pub use request_id::{attach_trace_id, REQUEST_ID_HEADER};
