//! Transport abstraction for fetching proving artifacts.
//!
//! The provisioner only talks to the `Transport` trait; `HttpTransport` is the
//! production implementation and `MockTransport` an in-memory fake.

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpTransport;
pub use mock::{MockTransport, MockTransportConfig, TransportCall};
pub use traits::{FileStat, TransferOutcome, Transport, TransportError, TransportResult};
