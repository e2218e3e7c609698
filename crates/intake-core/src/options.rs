//! Parse configuration.

use tokio::sync::mpsc::UnboundedSender;
use typed_builder::TypedBuilder;

use intake_model::{FormOptions, PartOutcome, StoragePolicy};

/// Configuration for one parse: which metadata to extract, whether and how
/// to decode the body, and the per-file storage policy.
///
/// Metadata extraction is on and body decoding off by default, so a plain
/// `ParseOptions::default()` never touches the body stream.
#[derive(Debug, TypedBuilder)]
pub struct ParseOptions {
    /// Path prefix applied to every stored file's subfolder.
    #[builder(default)]
    pub namespace: Option<String>,

    /// Extract the header mapping.
    #[builder(default = true)]
    pub headers: bool,

    /// Extract the query mapping.
    #[builder(default = true)]
    pub query: bool,

    /// Extract the request method.
    #[builder(default = true)]
    pub method: bool,

    /// Extract the request path.
    #[builder(default = true)]
    pub path: bool,

    /// Decode the request body.
    #[builder(default = false)]
    pub body: bool,

    /// Tokenizer tuning: limits, buffering, charset, path preservation.
    #[builder(default)]
    pub form: FormOptions,

    /// Per-file storage policy hooks.
    #[builder(default)]
    pub storage: StoragePolicy,

    /// Optional diagnostics channel receiving each file part's fate.
    #[builder(default)]
    pub outcomes: Option<UnboundedSender<PartOutcome>>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
