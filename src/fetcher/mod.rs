pub mod client;
pub mod errors;
pub mod pipeline;
pub mod retry;
pub mod types;

pub use client::{HttpSettings, HttpTransport, Transport, build_client};
pub use errors::{FetchError, FetchErrorKind};
pub use retry::{Fetcher, RetryPolicy};
pub use types::{Charset, PageResponse};
