//! # Booktable Client
//!
//! Keeps one page of a remote book table on screen while the user searches,
//! sorts, pages and edits it.
//!
//! [`PageController`] owns a [`booktable_engine::PageSession`] and talks to a
//! [`BookSource`]. [`HttpSource`] is the source for a running
//! booktable-server; tests and embedders can supply their own.
//!
//! ```rust,no_run
//! use booktable_client::{HttpSource, PageController};
//! use booktable_engine::Field;
//!
//! # async fn run() -> booktable_client::Result<()> {
//! let controller = PageController::new(HttpSource::new("http://localhost:3000"));
//! controller.refresh().await?;
//!
//! if let Some(first) = controller.working().first() {
//!     controller.edit(&first.id, Field::Genre, "Science Fiction")?;
//! }
//! let result = controller.save().await?;
//! println!("modified {}", result.modified_count);
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod error;
pub mod http;
pub mod source;

pub use controller::{ControllerConfig, PageController, DEFAULT_DEBOUNCE};
pub use error::{ClientError, Result};
pub use http::HttpSource;
pub use source::BookSource;
