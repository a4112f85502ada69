pub mod dispatch;
pub mod header;
pub mod nonce;
pub mod request;
pub mod signature;
pub mod transport;

pub use dispatch::{validate_response, DispatchError, DispatchReceipt, RequestDispatcher};
pub use header::{build_auth_header, build_headers, parse_auth_header, Headers, OAUTH_VERSION};
pub use nonce::{NonceGenerator, NONCE_LEN};
pub use request::SignedRequestContext;
pub use signature::{oauth_encode, sign, SignatureError};
pub use transport::{
    HttpResponse, HttpTransport, MockTransport, RecordedRequest, ReqwestTransport, TransportError,
};
