//! NSPI transports: the backend contract, the RPC stub marshaller and the
//! MAPI/HTTP client.

mod backend;
mod body;
mod chunked;
mod error;
mod http;
mod rpc;
mod session;
#[cfg(feature = "http-client")]
mod ureq_exchange;

pub use backend::{
    BackendKind, GetMatchesRequest, MatchSet, NspiBackend, Positioned, Reply, SpecialTable,
};
pub use body::{
    BindResponse, CELL_ERROR, CELL_NOT_FOUND, CELL_PRESENT, ColumnRows, CompareMidsResponse,
    MatchesResponse, ROW_FLAGGED, ROW_STANDARD, RequestBody, ResolveNamesResponse,
    ResortResponse, RowResponse, SpecialTableResponse, StatusResponse, TableResponse,
    TagsResponse, UpdateStatResponse, decode_response, encode_response, encode_service_failure,
};
pub use chunked::{ChunkedResponse, MetaTag, frame_response};
pub use error::TransportError;
pub use http::{CONTENT_TYPE, HttpBackend, HttpConfig, HttpExchange, HttpRequest, HttpResponse};
pub use rpc::{CONTEXT_HANDLE_SIZE, ContextHandle, RpcBackend, RpcChannel};
pub use session::{Cookie, CookieJar, HttpSession};
#[cfg(feature = "http-client")]
pub use ureq_exchange::UreqExchange;
