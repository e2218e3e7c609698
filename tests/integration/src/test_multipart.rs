//! Multipart decoding and file persistence scenarios.

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use intake_core::{
        BodyParser, DecodeError, FormLimits, FormOptions, InboundRequest, ParseOptions,
        PartOutcome, PolicySlot, SkipReason, StoragePolicy,
    };

    use crate::{one_chunk, request_parts};

    const BOUNDARY: &str = "----intake-integration";

    fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    fn field_and_file_body() -> String {
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"name\"\r\n\
             \r\n\
             foo\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"attachment\"; filename=\"hello.txt\"\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             hello from the upload\r\n\
             --{BOUNDARY}--\r\n"
        )
    }

    #[tokio::test]
    async fn test_should_decode_field_and_store_file_under_limits() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let parser = BodyParser::with_tmp_dir(tmp.path());
        let parts = request_parts("POST", "/upload", Some(&content_type()));
        let options = ParseOptions::builder()
            .body(true)
            .form(
                FormOptions::builder()
                    .limits(
                        FormLimits::builder()
                            .max_files(Some(1))
                            .max_fields(Some(1))
                            .build(),
                    )
                    .build(),
            )
            .build();

        let parsed = parser
            .parse(
                InboundRequest::new(&parts, one_chunk(field_and_file_body())),
                &options,
            )
            .await
            .expect("multipart body decodes");

        let body = parsed.body.expect("body decoded");
        assert_eq!(body.fields, Some(serde_json::json!({"name": "foo"})));

        let files = body.files.expect("file recorded");
        let saved = files.get("attachment").expect("attachment entry");
        assert!(saved.path.starts_with(tmp.path()));
        assert_eq!(saved.mimetype, "text/plain");

        let content = tokio::fs::read(&saved.path).await.expect("read stored file");
        assert_eq!(content, b"hello from the upload");
    }

    #[tokio::test]
    async fn test_should_leave_existing_destination_untouched() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let existing = tmp.path().join("hello.txt");
        tokio::fs::write(&existing, b"original content")
            .await
            .expect("seed existing file");

        let parser = BodyParser::with_tmp_dir(tmp.path());
        let parts = request_parts("POST", "/upload", Some(&content_type()));
        let options = ParseOptions::builder().body(true).build();

        let parsed = parser
            .parse(
                InboundRequest::new(&parts, one_chunk(field_and_file_body())),
                &options,
            )
            .await
            .expect("parse settles despite the collision");

        // The existing file's contents are unchanged and no entry was added.
        let content = tokio::fs::read(&existing).await.expect("read back");
        assert_eq!(content, b"original content");
        let body = parsed.body.expect("body decoded");
        assert!(body.files.is_none());
        // The simple field still decoded.
        assert_eq!(body.fields, Some(serde_json::json!({"name": "foo"})));
    }

    #[tokio::test]
    async fn test_should_reject_file_count_limit_without_leaving_partial_files() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"first\"; filename=\"one.bin\"\r\n\
             \r\n\
             first file\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"second\"; filename=\"two.bin\"\r\n\
             \r\n\
             second file\r\n\
             --{BOUNDARY}--\r\n"
        );
        let parser = BodyParser::with_tmp_dir(tmp.path());
        let parts = request_parts("POST", "/upload", Some(&content_type()));
        let options = ParseOptions::builder()
            .body(true)
            .form(
                FormOptions::builder()
                    .limits(FormLimits::builder().max_files(Some(1)).build())
                    .build(),
            )
            .build();

        let result = parser
            .parse(InboundRequest::new(&parts, one_chunk(body)), &options)
            .await;

        assert!(matches!(result, Err(DecodeError::FilesLimit(1))));
        // The first file was fully written before the limit tripped; the
        // exceeding part never reached disk.
        assert!(tmp.path().join("one.bin").exists());
        assert!(!tmp.path().join("two.bin").exists());
    }

    #[tokio::test]
    async fn test_should_compose_hooks_and_namespace_into_destination() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let parser = BodyParser::with_tmp_dir("/nonexistent-default");
        let parts = request_parts("POST", "/upload", Some(&content_type()));

        let root = tmp.path().to_path_buf();
        let storage = StoragePolicy::default()
            .with_tmp_root(PolicySlot::hook(move |_| {
                let root = root.clone();
                Box::pin(async move { Ok(root) })
            }))
            .with_subfolder(PolicySlot::value(PathBuf::from("attachments")))
            .with_save_as(PolicySlot::hook(|part| {
                let field = part.field_name.clone();
                Box::pin(async move { Ok(format!("{field}.stored")) })
            }));

        let options = ParseOptions::builder()
            .body(true)
            .namespace(Some("req-42".to_owned()))
            .storage(storage)
            .build();

        let parsed = parser
            .parse(
                InboundRequest::new(&parts, one_chunk(field_and_file_body())),
                &options,
            )
            .await
            .expect("parse succeeds");

        let files = parsed.body.and_then(|b| b.files).expect("file recorded");
        let saved = files.get("attachment").expect("attachment entry");
        assert_eq!(
            saved.path,
            tmp.path().join("req-42/attachments/attachment.stored")
        );
        let content = tokio::fs::read(&saved.path).await.expect("read stored file");
        assert_eq!(content, b"hello from the upload");
    }

    #[tokio::test]
    async fn test_should_drain_declined_file_and_report_outcomes() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let parser = BodyParser::with_tmp_dir(tmp.path());
        let parts = request_parts("POST", "/upload", Some(&content_type()));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let storage = StoragePolicy::default().with_handle(PolicySlot::hook(|part| {
            // Only persist parts submitted under "attachment".
            let accept = part.field_name == "attachment";
            Box::pin(async move { Ok(accept) })
        }));
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"rejected\"; filename=\"nope.bin\"\r\n\
             \r\n\
             discarded bytes\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"attachment\"; filename=\"kept.bin\"\r\n\
             \r\n\
             kept bytes\r\n\
             --{BOUNDARY}--\r\n"
        );
        let options = ParseOptions::builder()
            .body(true)
            .storage(storage)
            .outcomes(Some(tx))
            .build();

        let parsed = parser
            .parse(InboundRequest::new(&parts, one_chunk(body)), &options)
            .await
            .expect("parse succeeds");

        let files = parsed.body.and_then(|b| b.files).expect("files recorded");
        assert!(files.contains_key("attachment"));
        assert!(!files.contains_key("rejected"));
        assert!(!tmp.path().join("nope.bin").exists());

        assert_eq!(
            rx.try_recv().expect("first outcome"),
            PartOutcome::Skipped {
                field_name: "rejected".to_owned(),
                reason: SkipReason::Declined,
            }
        );
        match rx.try_recv().expect("second outcome") {
            PartOutcome::Written {
                field_name, bytes, ..
            } => {
                assert_eq!(field_name, "attachment");
                assert_eq!(bytes, b"kept bytes".len() as u64);
            }
            other => panic!("expected a written outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_skip_unnamed_file_part_but_keep_fields() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let parser = BodyParser::with_tmp_dir(tmp.path());
        let parts = request_parts("POST", "/upload", Some(&content_type()));
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"blob\"; filename=\"\"\r\n\
             \r\n\
             nameless bytes\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\
             \r\n\
             still here\r\n\
             --{BOUNDARY}--\r\n"
        );
        let options = ParseOptions::builder().body(true).build();

        let parsed = parser
            .parse(InboundRequest::new(&parts, one_chunk(body)), &options)
            .await
            .expect("parse succeeds");

        let body = parsed.body.expect("body decoded");
        assert!(body.files.is_none());
        assert_eq!(body.fields, Some(serde_json::json!({"note": "still here"})));
    }
}
