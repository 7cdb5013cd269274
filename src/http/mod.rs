pub mod chunked;
pub mod request;
pub mod response;
pub mod types;

pub use request::{ParseOutcome, Request, RequestParser};
pub use response::ResponseBuilder;
pub use types::{HeaderMap, Method, StatusCode, Version};
