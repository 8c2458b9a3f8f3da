//! Request handlers for book table operations.

mod books;

pub use books::*;
