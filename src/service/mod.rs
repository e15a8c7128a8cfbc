pub mod assets;
pub mod cors;
pub mod dispatch;
pub mod http;
