//! Trait definitions for external collaborators
//!
//! Session persistence is reached through [`session::SessionStore`], so the
//! flash helpers work with any backing store.

#[cfg(feature = "sessions")]
pub mod session;
