//! HTTP surface of the token service
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/tokens` | Issue a credential for `{ "userId" }` |
//! | `GET` | `/api/health` | Liveness, timestamp and uptime |
//! | `GET` | `/` | Service name, version and endpoints |

pub mod error;
pub mod health;
pub mod rate_limit;
pub mod router;
mod server;
pub mod tokens;
pub mod validation;

pub use error::{ApiError, ErrorBody};
pub use router::{AppState, create_router};
pub use server::TokenService;
pub use validation::{ValidationError, validate_token_request};
