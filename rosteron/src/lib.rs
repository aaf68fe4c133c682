//! Read-only RosterOn Mobile roster access
//!
//! This library logs in to an instance of RosterOn Mobile (a workforce
//! management product from Allocate Software), retrieves the logged-in user's
//! roster and logs out again. RosterOn has no API, so every step works from
//! the HTML pages a phone browser would see.
//!
//! # Features
//!
//! - Cookie-based login with explicit credential/shape error reporting
//! - Roster retrieval as an ordered [`Snapshot`] of dated [`Item`]s
//! - Scoped sessions that always log out, even on error or panic
//! - Optional on-disk request/response log for diagnosing markup differences
//! - Secure TLS using rustls, blocking synchronous API
//!
//! Roster output is minimally structured on the assumption that each RosterOn
//! instance formats its rows differently: an item's detail is whatever cells
//! its row contains, in order.
//!
//! # Example
//!
//! ```no_run
//! use rosteron::{RosterError, Session};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new("https://rosteron.xyz.com.au/RosterOnProd/Mobile")?;
//!
//! let result = session.scoped(|session| {
//!     session.log_in("joe.bloggs", "abc123")?;
//!     session.get_roster()
//! });
//!
//! match result {
//!     Ok(snapshot) => {
//!         println!("{}", snapshot);
//!         for item in &snapshot {
//!             println!("{}", item);
//!         }
//!     }
//!     Err(RosterError::BadCredentials { username }) => {
//!         eprintln!("Wrong password for {}", username);
//!     }
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

mod auth;
mod browser;
mod debug_log;
mod error;
mod roster;
mod session;
mod transport;

pub use auth::AuthState;
pub use error::RosterError;
pub use roster::{Item, Snapshot};
pub use session::{Session, SessionBuilder};
