//! HTTP layer: `/predict`, `/health` and the landing page.

mod error;
mod routes;

pub use error::ApiError;
pub use routes::{router, serve};
