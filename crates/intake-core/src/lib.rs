//! Streaming request normalization engine.
//!
//! Intake turns one inbound HTTP request into one [`ParsedRequest`]:
//! metadata (case-insensitive multi-value headers, literal-key query,
//! method, path) plus an optionally decoded body, while streaming uploaded
//! files to storage under caller-supplied, per-file policy hooks — without
//! ever buffering a whole upload in memory.
//!
//! The engine sits between three collaborators it does not reimplement:
//! the transport (bridged through [`bridge::PushSource`] or any
//! [`http_body::Body`] via [`bridge::HttpBodyStream`]), the form tokenizer
//! (the `intake-form` crate), and the filesystem (`tokio::fs`).
//!
//! # Example
//!
//! ```
//! use intake_core::{BodyParser, InboundRequest, ParseOptions};
//!
//! # tokio_test::block_on(async {
//! let (parts, ()) = http::Request::builder()
//!     .method("POST")
//!     .uri("/submit?src=cli")
//!     .header("content-type", "application/json")
//!     .body(())
//!     .unwrap()
//!     .into_parts();
//!
//! let chunk = Ok::<_, intake_core::DecodeError>(bytes::Bytes::from_static(b"{\"a\":1}"));
//! let body = futures::stream::iter(vec![chunk]);
//! let parser = BodyParser::new();
//! let options = ParseOptions::builder().body(true).build();
//!
//! let parsed = parser
//!     .parse(InboundRequest::new(&parts, body), &options)
//!     .await
//!     .unwrap();
//! assert_eq!(parsed.method.as_deref(), Some("POST"));
//! assert!(parsed.body.is_some());
//! # });
//! ```

pub mod bridge;
pub mod collect;
mod decoder;
pub mod dispatch;
pub mod metadata;
mod options;
mod parser;
mod store;

pub use options::ParseOptions;
pub use parser::{BodyParser, InboundRequest};

// Re-export the model so engine users need only this crate.
pub use intake_model::{
    BodyPayload, DecodeError, DecodeResult, FilePart, FormLimits, FormOptions, HeaderValues,
    ParsedRequest, PartOutcome, PolicySlot, SavedFile, SkipReason, StoragePolicy,
};
