//! Urlencoded decoding scenarios.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use intake_core::{BodyParser, InboundRequest, ParseOptions};

    use crate::{body_chunks, one_chunk, request_parts};

    fn options() -> ParseOptions {
        ParseOptions::builder().body(true).build()
    }

    #[tokio::test]
    async fn test_should_round_trip_a_field_set() {
        let mut original = BTreeMap::new();
        original.insert("name".to_owned(), "Grace Hopper".to_owned());
        original.insert("lang".to_owned(), "COBOL & FLOW-MATIC".to_owned());
        original.insert("year".to_owned(), "1959".to_owned());

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &original {
            serializer.append_pair(key, value);
        }
        let encoded = serializer.finish();

        let parts = request_parts(
            "POST",
            "/form",
            Some("application/x-www-form-urlencoded"),
        );
        let parser = BodyParser::new();
        let parsed = parser
            .parse(InboundRequest::new(&parts, one_chunk(encoded)), &options())
            .await
            .expect("urlencoded body decodes");

        let fields = parsed
            .body
            .and_then(|b| b.fields)
            .expect("fields decoded");
        let expected: serde_json::Value = original
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect::<serde_json::Map<_, _>>()
            .into();
        assert_eq!(fields, expected);
    }

    #[tokio::test]
    async fn test_should_apply_last_write_wins_for_duplicate_fields() {
        let parts = request_parts(
            "POST",
            "/form",
            Some("application/x-www-form-urlencoded"),
        );
        let parser = BodyParser::new();
        let parsed = parser
            .parse(
                InboundRequest::new(&parts, one_chunk("k=first&k=last")),
                &options(),
            )
            .await
            .expect("decodes");

        assert_eq!(
            parsed.body.and_then(|b| b.fields),
            Some(serde_json::json!({"k": "last"}))
        );
    }

    #[tokio::test]
    async fn test_should_decode_body_split_across_many_chunks() {
        let encoded = "alpha=1&beta=two&gamma=three";
        let chunks = encoded
            .as_bytes()
            .chunks(5)
            .map(bytes::Bytes::copy_from_slice)
            .collect();

        let parts = request_parts(
            "POST",
            "/form",
            Some("application/x-www-form-urlencoded"),
        );
        let parser = BodyParser::new();
        let parsed = parser
            .parse(InboundRequest::new(&parts, body_chunks(chunks)), &options())
            .await
            .expect("decodes");

        assert_eq!(
            parsed.body.and_then(|b| b.fields),
            Some(serde_json::json!({
                "alpha": "1",
                "beta": "two",
                "gamma": "three"
            }))
        );
    }

    #[tokio::test]
    async fn test_should_produce_empty_body_payload_for_empty_body() {
        let parts = request_parts(
            "POST",
            "/form",
            Some("application/x-www-form-urlencoded"),
        );
        let parser = BodyParser::new();
        let parsed = parser
            .parse(InboundRequest::new(&parts, crate::no_body()), &options())
            .await
            .expect("empty body decodes");

        let body = parsed.body.expect("body payload present");
        assert!(body.is_empty());
    }
}
