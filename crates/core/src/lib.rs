//! Session and retry engine for booking appointment slots on the Prenotami
//! reservation portal.
//!
//! The portal exposes no API, only a server-rendered UI, so the engine
//! drives a real browser: it establishes an authenticated session (pausing
//! for the operator to solve the login CAPTCHA), then polls the booking
//! calendar under a retry policy until a slot is claimed, the policy is
//! exhausted, or a fatal condition surfaces.
//!
//! Control flow: [`auth::Authenticator`] (with [`store::SessionStore`] and
//! [`session::BrowserSession`]) yields an authenticated context, then
//! [`scheduler::RetryScheduler`] loops locale switch → scan → attempt until
//! a terminal [`types::RunOutcome`].

pub mod auth;
pub mod book;
pub mod config;
pub mod driver;
pub mod error;
pub mod locale;
pub mod policy;
pub mod portal;
pub mod runner;
pub mod scan;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use auth::{AuthState, Authenticator, ManualGate};
pub use book::BookingAttempt;
pub use config::BotConfig;
pub use error::{BotError, Result};
pub use locale::LocaleSwitcher;
pub use policy::RetryPolicy;
pub use runner::{PortalSession, run};
pub use scan::SlotScanner;
pub use scheduler::{Portal, RetryScheduler};
pub use session::{BrowserSession, LaunchOptions};
pub use store::{SessionSnapshot, SessionStore};
pub use types::{AttemptResult, Credentials, Locale, RunOutcome, SlotCandidate};
