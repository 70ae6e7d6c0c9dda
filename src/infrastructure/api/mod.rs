pub mod client;
pub mod models;
pub mod transport;

pub use client::{ApiClient, ReqwestExecutor};
pub use transport::{ApiRequest, ApiResponse, ApiTransport, HttpExecute, HttpMethod};
