//! # HR Desk Core
//!
//! The synchronous domain engine behind the HR Desk portal: employee
//! directory, departments and positions, event announcements, leave
//! applications, attendance, and the credential side of authentication.
//!
//! ## Layout
//!
//! ```text
//! storage      redb document store (one table per document type)
//! sequence     EMP#### / LV#### counters, bumped inside the writing transaction
//! credentials  argon2 password hashes, reset-token generation and digests
//! account      login check, password reset, password change, session revocation
//! directory    users and their department/position placement
//! org          departments and positions
//! events       event announcements
//! leave        leave applications and the approval workflow
//! attendance   daily check-in/out and administrator records
//! dashboard    headline counts
//! ```
//!
//! Every operation takes the [`Store`] explicitly and, where time matters,
//! a `now` argument; nothing here reads the wall clock or does I/O beyond
//! the database file.

pub mod account;
pub mod attendance;
pub mod credentials;
pub mod dashboard;
pub mod directory;
pub mod error;
pub mod events;
pub mod leave;
pub mod org;
pub mod sequence;
pub mod storage;
pub mod validate;

pub use directory::{Role, User, UserView};
pub use error::{HrError, HrResult};
pub use sequence::Sequence;
pub use storage::{Document, Store, StoreCounts};
