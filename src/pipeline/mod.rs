//! Pipeline stages around the markdown structurer.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the network-facing step can be pointed at a mock endpoint.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ slice ──▶ upload ──▶ structure
//! (path/URL) (pdfium) (multipart) (crate::structure)
//! ```
//!
//! 1. [`input`] : canonicalise the user-supplied path or URL to a local file
//! 2. [`slice`] : copy the requested page range into a temporary PDF; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`upload`]: post the file to the analysis service with retry/backoff
//!    and pull `data.markdown` out of the reply

pub mod input;
pub mod slice;
pub mod upload;
