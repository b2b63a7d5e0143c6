//! Driver and admin authentication
//!
//! Drivers sign in with a one-time code sent to their phone (first use
//! creates the account) or with a password they set later. Admins sign in
//! with a configured username and argon2 hash. Both receive an HS256 JWT.

pub mod error;
pub mod otp;
pub mod password;
pub mod service;
pub mod session;

pub use error::AuthError;
pub use otp::{LogOtpSender, OtpSender, OtpStore};
pub use service::{AuthService, DriverSession, OtpTicket};
pub use session::{Claims, Role, Session, SessionManager};
