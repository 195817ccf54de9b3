pub mod flights;
pub mod health;
pub mod status;

use serde::Serialize;

pub use flights::*;
pub use health::*;
pub use status::*;

/// Envelope for `/data/*` responses
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}
