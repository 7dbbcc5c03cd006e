//! Sign-in: OAuth flow, sessions and their expiry.

pub mod oauth;
pub mod session;
pub mod sweeper;

pub use oauth::{OAuthClient, TokenGrant, scopes};
pub use session::{Session, SessionStore, SessionView, SweepStats, UserProfile};
pub use sweeper::SessionSweeper;
