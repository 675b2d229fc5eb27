pub mod generate;
pub mod headers;
pub mod negotiation;

pub use generate::{__path_handle_generate, handle_generate};
pub use headers::HeaderMapExt;
pub use negotiation::require_json;
