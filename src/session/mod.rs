//! Session-oriented compositing driver.

/// The overlay render session and its cancellation token.
pub mod overlay_session;
