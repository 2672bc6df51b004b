// Auth gate: turns a bearer token into a request-scoped ViewerContext

pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use viewer_context_extractor::Vc;
pub use viewer_context_middleware::*;
