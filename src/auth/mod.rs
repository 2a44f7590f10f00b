//! Authenticated access to the AniLog API.
//!
//! - [`AuthGateway::send`] attaches the stored bearer token, and on a 401
//!   refreshes the token once and retries the request once
//! - [`AuthGateway::login`] / [`AuthGateway::logout`] create and tear down
//!   the stored [`Session`]
//!
//! # Example
//!
//! ```ignore
//! use anilog::auth::{ApiRequest, AuthGateway, Outcome};
//!
//! let gateway = AuthGateway::new(client, "http://localhost:8080", store);
//! match gateway.send(&ApiRequest::get("/api/profile/7")).await? {
//!     Outcome::Completed(response) => println!("{}", response.text()),
//!     Outcome::Unauthorized(_) | Outcome::SessionMissing => println!("please log in again"),
//! }
//! ```

mod gateway;
mod login;
mod request;
mod session;

pub use gateway::{AuthGateway, GatewayError, Outcome};
pub use login::LoginError;
pub use request::{ApiRequest, ApiResponse};
pub use session::Session;
