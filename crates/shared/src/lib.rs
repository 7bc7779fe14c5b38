pub mod domain;
pub mod envelope;
pub mod error;

pub use domain::{Method, RequestId};
pub use envelope::{RequestConfig, ResponseEnvelope};
pub use error::{ErrorCode, TransportError};
