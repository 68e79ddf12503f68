//! Network access: transport trait, reqwest transport, retrying fetcher.

pub mod fetcher;
pub mod http;
pub mod transport;

pub use fetcher::{
    AttemptError, FetchError, ResilientFetcher, RetryPolicy, Sleeper, ThreadSleeper,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, DEFAULT_WAIT,
};
pub use http::ReqwestTransport;
pub use transport::{HttpResponse, Transport, TransportError};
