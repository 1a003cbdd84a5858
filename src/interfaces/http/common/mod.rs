//! Pieces shared by every HTTP module.

pub mod error;
pub mod response;
pub mod validated_json;

pub use error::ApiError;
pub use response::{ApiResponse, EmptyData};
pub use validated_json::ValidatedJson;
