pub mod repository;
pub mod pull_request;
pub mod comment;
pub mod label;

pub use repository::*;
pub use pull_request::*;
pub use comment::*;
pub use label::*;
