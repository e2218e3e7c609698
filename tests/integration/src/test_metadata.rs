//! Metadata extraction scenarios.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::stream;
    use intake_core::{BodyParser, DecodeResult, HeaderValues, InboundRequest, ParseOptions};

    use crate::{init_tracing, no_body, request_parts};

    #[tokio::test]
    async fn test_should_promote_repeated_header_preserving_order() {
        init_tracing();
        let req = http::Request::builder()
            .method("GET")
            .uri("/headers")
            .header("accept", "text/html")
            .header("set-cookie", "first=1")
            .header("set-cookie", "second=2")
            .body(())
            .expect("valid request");
        let (parts, ()) = req.into_parts();

        let parser = BodyParser::new();
        let parsed = parser
            .parse(
                InboundRequest::new(&parts, no_body()),
                &ParseOptions::default(),
            )
            .await
            .expect("metadata parse succeeds");

        let headers = parsed.headers.expect("headers extracted");
        assert_eq!(
            headers.get("accept"),
            Some(&HeaderValues::Scalar("text/html".to_owned()))
        );
        assert_eq!(
            headers.get("set-cookie"),
            Some(&HeaderValues::List(vec![
                "first=1".to_owned(),
                "second=2".to_owned()
            ]))
        );
    }

    #[tokio::test]
    async fn test_should_not_invoke_body_machinery_when_body_not_requested() {
        let parts = request_parts("POST", "/upload", Some("multipart/form-data; boundary=x"));
        let parser = BodyParser::new();

        // A body stream that panics the moment anything polls it.
        let guard = stream::poll_fn(|_| -> std::task::Poll<Option<DecodeResult<Bytes>>> {
            panic!("body stream polled although body was not requested");
        });

        let parsed = parser
            .parse(InboundRequest::new(&parts, guard), &ParseOptions::default())
            .await
            .expect("metadata-only parse succeeds");
        assert!(parsed.body.is_none());
    }

    #[tokio::test]
    async fn test_should_keep_bracketed_query_keys_literal() {
        let parts = request_parts("GET", "/search?tags[0]=rust&tags[1]=http&plain=1", None);
        let parser = BodyParser::new();
        let parsed = parser
            .parse(
                InboundRequest::new(&parts, no_body()),
                &ParseOptions::default(),
            )
            .await
            .expect("parse succeeds");

        let query = parsed.query.expect("query extracted");
        assert_eq!(query.get("tags[0]").map(String::as_str), Some("rust"));
        assert_eq!(query.get("tags[1]").map(String::as_str), Some("http"));
        assert_eq!(query.get("plain").map(String::as_str), Some("1"));
        assert!(!query.contains_key("tags"));
    }

    #[tokio::test]
    async fn test_should_pass_method_and_path_through() {
        let parts = request_parts("PUT", "/a/b/c?ignored=1", None);
        let parser = BodyParser::new();
        let parsed = parser
            .parse(
                InboundRequest::new(&parts, no_body()),
                &ParseOptions::default(),
            )
            .await
            .expect("parse succeeds");

        assert_eq!(parsed.method.as_deref(), Some("PUT"));
        assert_eq!(parsed.path.as_deref(), Some("/a/b/c"));
    }

    #[tokio::test]
    async fn test_should_respect_individual_toggles() {
        let parts = request_parts("GET", "/x?q=1", None);
        let parser = BodyParser::new();
        let options = ParseOptions::builder()
            .headers(false)
            .method(false)
            .build();

        let parsed = parser
            .parse(InboundRequest::new(&parts, no_body()), &options)
            .await
            .expect("parse succeeds");
        assert!(parsed.headers.is_none());
        assert!(parsed.method.is_none());
        assert!(parsed.query.is_some());
        assert!(parsed.path.is_some());
    }
}
