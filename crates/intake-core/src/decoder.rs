//! The tokenized form decoder.
//!
//! Drives a [`FormTokenizer`] to completion: simple fields collect into the
//! `fields` mapping (last write wins for duplicate names), and each file
//! part has its storage policy resolved — hooks awaited fully — before its
//! bytes flow. A part that will not be persisted is still drained chunk by
//! chunk so the tokenizer never stalls, and never more than one chunk of a
//! file is held in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use intake_form::{FormToken, FormTokenizer};
use intake_model::{
    BodyPayload, DecodeError, DecodeResult, FilePart, PartOutcome, SavedFile, SkipReason,
    StoragePolicy,
};

use crate::store::{self, OpenOutcome};

/// One decode run's context: policy, namespace, temp root, diagnostics.
pub(crate) struct FormDecoder<'a> {
    pub policy: &'a StoragePolicy,
    pub namespace: Option<&'a str>,
    pub tmp_dir: &'a Path,
    pub outcomes: Option<&'a UnboundedSender<PartOutcome>>,
}

impl FormDecoder<'_> {
    /// Drive the tokenizer to its terminal `Finish`, accumulating the body
    /// payload. Tokenizer errors are terminal and propagate unchanged.
    pub(crate) async fn decode<S>(
        &self,
        tokenizer: &mut FormTokenizer<S>,
    ) -> DecodeResult<BodyPayload>
    where
        S: Stream<Item = DecodeResult<Bytes>> + Unpin + Send,
    {
        let mut fields = serde_json::Map::new();
        let mut files: BTreeMap<String, SavedFile> = BTreeMap::new();

        loop {
            match tokenizer.next_token().await? {
                FormToken::Field { name, value } => {
                    // Later duplicates overwrite earlier ones.
                    fields.insert(name, serde_json::Value::String(value));
                }
                FormToken::FileBegin(part) => {
                    self.decode_file(tokenizer, part, &mut files).await?;
                }
                FormToken::FileChunk(_) | FormToken::FileEnd => {
                    return Err(DecodeError::Tokenizer(
                        "file bytes outside a file part".to_owned(),
                    ));
                }
                FormToken::Finish => break,
            }
        }

        Ok(BodyPayload {
            fields: (!fields.is_empty()).then(|| serde_json::Value::Object(fields)),
            files: (!files.is_empty()).then(|| files),
        })
    }

    /// Handle one file part: resolve policy, then stream or drain.
    async fn decode_file<S>(
        &self,
        tokenizer: &mut FormTokenizer<S>,
        part: FilePart,
        files: &mut BTreeMap<String, SavedFile>,
    ) -> DecodeResult<()>
    where
        S: Stream<Item = DecodeResult<Bytes>> + Unpin + Send,
    {
        // Policy resolution completes before any of the part's bytes move.
        let target = store::resolve_target(self.policy, &part, self.namespace, self.tmp_dir).await;

        let mut sink: Option<(tokio::fs::File, PathBuf)> = None;
        if !target.handle {
            self.report_skip(&part, SkipReason::Declined);
        } else if let Some(dest) = target.dest {
            match store::open_exclusive(&dest).await {
                OpenOutcome::Opened(file) => sink = Some((file, dest)),
                OpenOutcome::Skipped(reason) => {
                    debug!(
                        field = %part.field_name,
                        path = %dest.display(),
                        ?reason,
                        "not persisting file part"
                    );
                    self.report_skip(&part, reason);
                }
            }
        } else {
            self.report_skip(&part, SkipReason::Unnamed);
        }

        // Whether writing or not, the part must be consumed to completion.
        let mut written: u64 = 0;
        loop {
            match tokenizer.next_token().await {
                Ok(FormToken::FileChunk(chunk)) => {
                    let failure = match sink.as_mut() {
                        Some((file, _)) => match file.write_all(&chunk).await {
                            Ok(()) => {
                                written += chunk.len() as u64;
                                None
                            }
                            Err(e) => Some(e),
                        },
                        None => None,
                    };
                    if let Some(e) = failure {
                        warn!(field = %part.field_name, error = %e, "file write failed, discarding part");
                        if let Some((file, path)) = sink.take() {
                            drop(file);
                            store::discard_partial(&path).await;
                        }
                        self.report_skip(&part, SkipReason::Io(e.to_string()));
                    }
                }
                Ok(FormToken::FileEnd) => break,
                Ok(_) => {
                    return Err(DecodeError::Tokenizer(
                        "unexpected token inside file part".to_owned(),
                    ));
                }
                Err(e) => {
                    // Terminal error mid-part: drop the half-written file.
                    if let Some((file, path)) = sink.take() {
                        drop(file);
                        store::discard_partial(&path).await;
                    }
                    return Err(e);
                }
            }
        }

        if let Some((mut file, path)) = sink.take() {
            if let Err(e) = file.flush().await {
                warn!(field = %part.field_name, error = %e, "file flush failed, discarding part");
                drop(file);
                store::discard_partial(&path).await;
                self.report_skip(&part, SkipReason::Io(e.to_string()));
            } else {
                drop(file);
                debug!(
                    field = %part.field_name,
                    path = %path.display(),
                    written,
                    "stored file part"
                );
                if let Some(tx) = self.outcomes {
                    let _ = tx.send(PartOutcome::Written {
                        field_name: part.field_name.clone(),
                        path: path.clone(),
                        bytes: written,
                    });
                }
                files.insert(
                    part.field_name.clone(),
                    SavedFile {
                        path,
                        mimetype: part.mime_type.clone(),
                    },
                );
            }
        }

        Ok(())
    }

    /// Note a skipped part on the diagnostics channel.
    fn report_skip(&self, part: &FilePart, reason: SkipReason) {
        if let Some(tx) = self.outcomes {
            let _ = tx.send(PartOutcome::Skipped {
                field_name: part.field_name.clone(),
                reason,
            });
        }
    }
}
