//! Axum glue for the slack_oauth2 login flow
//!
//! Exposes the login-start and callback endpoints as a mountable router.
//! Session issuance from the resolved login record is left to the hosting
//! application.

mod error;
mod oauth2;
mod router;

pub use error::IntoResponseError;
pub use router::{slack_login_router, slack_login_router_no_trace};

// Re-export the route prefix and initialization function from the core crate
pub use slack_oauth2::{SLACK_ROUTE_PREFIX, init};
