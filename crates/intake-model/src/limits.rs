//! Tokenizer limits and tuning.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default cap on decoded field names, in bytes.
const DEFAULT_MAX_FIELD_NAME_SIZE: usize = 100;

/// Default cap on field values and on the whole-buffer decode path (1 MiB).
const DEFAULT_MAX_FIELD_SIZE: usize = 1_048_576;

/// Default rolling-buffer capacity for the tokenizers.
const DEFAULT_BUFFER_CAPACITY: usize = 8_192;

/// Size and count limits enforced while tokenizing a form body.
///
/// Count limits are terminal: exceeding them rejects the parse with the
/// matching [`DecodeError`](crate::DecodeError) variant. Size limits
/// truncate: the tokenizer stops accumulating at the cap and discards the
/// excess. `max_field_size` additionally serves as the byte ceiling for the
/// whole-buffer (JSON) decode path. All limits act at the moment of excess,
/// never retroactively.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct FormLimits {
    /// Maximum decoded field-name length in bytes; longer names are truncated.
    #[builder(default = DEFAULT_MAX_FIELD_NAME_SIZE)]
    pub max_field_name_size: usize,

    /// Maximum decoded field-value length in bytes; longer values are
    /// truncated. Also the whole-buffer decode ceiling. `None` = unlimited.
    #[builder(default = Some(DEFAULT_MAX_FIELD_SIZE))]
    pub max_field_size: Option<usize>,

    /// Maximum number of simple fields. `None` = unlimited.
    #[builder(default)]
    pub max_fields: Option<usize>,

    /// Maximum bytes written per file part; larger files are truncated at
    /// the cap. `None` = unlimited.
    #[builder(default)]
    pub max_file_size: Option<usize>,

    /// Maximum number of file parts. `None` = unlimited.
    #[builder(default)]
    pub max_files: Option<usize>,

    /// Maximum number of parts (fields plus files). `None` = unlimited.
    #[builder(default)]
    pub max_parts: Option<usize>,
}

impl Default for FormLimits {
    fn default() -> Self {
        Self {
            max_field_name_size: DEFAULT_MAX_FIELD_NAME_SIZE,
            max_field_size: Some(DEFAULT_MAX_FIELD_SIZE),
            max_fields: None,
            max_file_size: None,
            max_files: None,
            max_parts: None,
        }
    }
}

/// Tokenizer tuning: limits plus buffering, charset, and path handling.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct FormOptions {
    /// The size and count limits to enforce.
    #[builder(default)]
    pub limits: FormLimits,

    /// Initial capacity of the tokenizer's rolling buffer.
    #[builder(default = DEFAULT_BUFFER_CAPACITY)]
    pub buffer_capacity: usize,

    /// Charset used to decode field values: `"utf-8"` (lossy on invalid
    /// sequences) or `"latin1"`/`"iso-8859-1"`/`"binary"` (byte-per-char).
    /// Unrecognized values fall back to lossy UTF-8.
    #[builder(default = String::from("utf-8"))]
    pub default_charset: String,

    /// Keep the full client-supplied filename path instead of reducing it
    /// to its final component.
    #[builder(default = false)]
    pub preserve_path: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            limits: FormLimits::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            default_charset: String::from("utf-8"),
            preserve_path: false,
        }
    }
}
