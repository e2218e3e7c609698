//! Abort and stream-failure scenarios, including the push bridge end to end.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use intake_core::bridge::{Delivery, PushBodyStream, PushSource};
    use intake_core::{
        BodyParser, DecodeError, InboundRequest, ParseOptions, ParsedRequest,
    };

    use crate::{one_chunk, request_parts};

    /// A push source delivering canned chunks, uWebSockets style: nothing
    /// moves until the bridge registers interest.
    struct CannedSource {
        chunks: Vec<(Bytes, bool)>,
        next: usize,
        aborted: bool,
        fail_after_script: bool,
    }

    impl CannedSource {
        fn new(chunks: Vec<(Bytes, bool)>) -> Self {
            Self {
                chunks,
                next: 0,
                aborted: false,
                fail_after_script: false,
            }
        }
    }

    impl PushSource for CannedSource {
        fn request(&mut self, delivery: Delivery) {
            if self.next < self.chunks.len() {
                let (chunk, is_last) = self.chunks[self.next].clone();
                self.next += 1;
                delivery.supply(chunk, is_last);
            } else if self.fail_after_script {
                delivery.fail("connection reset by peer");
            } else {
                delivery.supply(Bytes::new(), true);
            }
        }

        fn is_aborted(&self) -> bool {
            self.aborted
        }
    }

    #[tokio::test]
    async fn test_should_settle_empty_result_for_pre_aborted_request() {
        let parts = request_parts("POST", "/upload?k=v", Some("application/json"));
        let parser = BodyParser::new();
        let request =
            InboundRequest::new(&parts, one_chunk("{\"a\":1}")).with_aborted(true);

        let parsed = parser
            .parse(request, &ParseOptions::builder().body(true).build())
            .await
            .expect("aborted request settles immediately");

        // Not even metadata is populated.
        assert_eq!(parsed, ParsedRequest::default());
    }

    #[tokio::test]
    async fn test_should_parse_body_delivered_through_push_bridge() {
        let parts = request_parts(
            "POST",
            "/form",
            Some("application/x-www-form-urlencoded"),
        );
        let source = CannedSource::new(vec![
            (Bytes::from_static(b"a=1&b"), false),
            (Bytes::from_static(b"=2"), true),
        ]);
        let stream = PushBodyStream::new(source);

        let parser = BodyParser::new();
        let parsed = parser
            .parse(
                InboundRequest::new(&parts, stream),
                &ParseOptions::builder().body(true).build(),
            )
            .await
            .expect("push-delivered body decodes");

        assert_eq!(
            parsed.body.and_then(|b| b.fields),
            Some(serde_json::json!({"a": "1", "b": "2"}))
        );
    }

    #[tokio::test]
    async fn test_should_treat_bridge_abort_as_end_of_stream() {
        let parts = request_parts(
            "POST",
            "/form",
            Some("application/x-www-form-urlencoded"),
        );
        let mut source = CannedSource::new(vec![(Bytes::from_static(b"never=seen"), true)]);
        source.aborted = true;
        let stream = PushBodyStream::new(source);
        let aborted = stream.is_aborted();

        let parser = BodyParser::new();
        let parsed = parser
            .parse(
                InboundRequest::new(&parts, stream).with_aborted(aborted),
                &ParseOptions::builder().body(true).build(),
            )
            .await
            .expect("aborted request settles");
        assert_eq!(parsed, ParsedRequest::default());
    }

    #[tokio::test]
    async fn test_should_reject_with_stream_error_on_push_failure() {
        let parts = request_parts(
            "POST",
            "/form",
            Some("application/x-www-form-urlencoded"),
        );
        let mut source = CannedSource::new(vec![(Bytes::from_static(b"k=v&"), false)]);
        source.fail_after_script = true;
        let stream = PushBodyStream::new(source);

        let parser = BodyParser::new();
        let result = parser
            .parse(
                InboundRequest::new(&parts, stream),
                &ParseOptions::builder().body(true).build(),
            )
            .await;

        match result {
            Err(DecodeError::Stream(reason)) => {
                assert!(reason.contains("connection reset"));
            }
            other => panic!("expected a stream rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_reject_multipart_cut_off_mid_transfer() {
        let boundary = "cutoff";
        let parts = request_parts(
            "POST",
            "/upload",
            Some("multipart/form-data; boundary=cutoff"),
        );
        // The closing delimiter never arrives: the bridge reports a clean
        // end of stream, which mid-part is a malformed form.
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"doc\"; filename=\"partial.bin\"\r\n\
             \r\n\
             half of the upload"
        );
        let tmp = tempfile::tempdir().expect("temp dir");
        let parser = BodyParser::with_tmp_dir(tmp.path());

        let result = parser
            .parse(
                InboundRequest::new(&parts, one_chunk(body)),
                &ParseOptions::builder().body(true).build(),
            )
            .await;

        assert!(matches!(result, Err(DecodeError::Tokenizer(_))));
        // The partially written destination was cleaned up.
        assert!(!tmp.path().join("partial.bin").exists());
    }
}
