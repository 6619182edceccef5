// src/routing/mod.rs

//! Input/output path routing.
//!
//! - [`router`] derives a default output path from the input path and the
//!   mode flag, and detects manual edits so it never clobbers them.

pub mod router;

pub use router::{
    append_marker, is_archive, strip_marker, PathRouter, PathState, ARCHIVE_EXTENSION,
};
