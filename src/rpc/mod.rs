//! Wire-level pieces shared by the session: request description and
//! encoding, response classification, the remote error taxonomy, and the
//! transport seam.

pub mod classifier;
pub mod encoder;
pub mod errors;
pub mod params;
pub mod reqwest_client;
pub mod transport;
pub mod types;

pub use classifier::{Envelope, ProtocolError, classify, json_iter_parse};
pub use encoder::{RequestEncoder, RequestEnvelope};
pub use errors::{ApiError, ErrorCode, ErrorKind};
pub use params::{stringify_value, stringify_values};
pub use reqwest_client::ReqwestTransport;
pub use transport::{Transport, TransportError, TransportResponse};
pub use types::{MethodRequest, MethodRequestBuilder, Namespace};
