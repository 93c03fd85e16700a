pub mod logging;
pub mod trace_context;

pub use logging::{init_tracing, LogFormat};
pub use trace_context::{
    extract_request_id, inject_request_id, new_request_id, TracedClientExt, TracedRequest,
    REQUEST_ID_HEADER,
};
