pub mod context;
pub mod error;

pub use context::SiteContext;
pub use error::{ErrorContext, SiteError, SiteResult};
