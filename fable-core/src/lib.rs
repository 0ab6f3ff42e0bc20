//! Storytelling engine with an AI narrator for young children.
//!
//! This crate provides:
//! - A fixed three-question profile intake with retry-to-default validation
//! - An AI narrator that turns user requests into story chapters with
//!   bounded, origin-pinned story memory
//! - Keyword-based intent tagging and an illustration cadence policy
//! - Deterministic fallbacks for every generation failure
//!
//! # Quick Start
//!
//! ```ignore
//! use fable_core::{GeminiBackend, StorySession};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(GeminiBackend::from_env()?);
//!     let mut session = StorySession::new(backend);
//!
//!     println!("{}", session.welcome_message());
//!     let reply = session.handle_message("숫자").await;
//!     println!("{}", reply.text);
//!     Ok(())
//! }
//! ```

pub mod gallery;
pub mod narrator;
pub mod profile;
pub mod session;
pub mod testing;

// Primary public API
pub use gallery::ImageGallery;
pub use narrator::{GeminiBackend, Illustration, Narrator, StoryBackend, StoryLog};
pub use profile::{IntakeStage, Profile, ProfileCollector, ValidationError};
pub use session::{Attachment, Reply, Stage, StoryConfig, StorySession};
pub use testing::{MockBackend, StoryHarness};
