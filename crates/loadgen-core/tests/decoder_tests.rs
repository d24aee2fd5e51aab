use loadgen_common::Endpoint;
use loadgen_core::decoder::{classify, Frame, LineBuffer, StreamDecoder};

fn decode(endpoint: Endpoint, lines: &[&str]) -> StreamDecoder {
    let mut decoder = StreamDecoder::new(endpoint);
    decoder.feed_lines(lines);
    decoder
}

#[test]
fn chat_deltas_concatenate() {
    let d = decode(Endpoint::Chat, &[
        r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#,
        "",
        r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#,
        "",
        "data: [DONE]",
    ]);
    assert_eq!(d.text(), "Hello");
    assert_eq!(d.state().chunk_count, 2);
    assert_eq!(d.state().total_lines_seen, 3);
    assert!(d.is_finished());
}

#[test]
fn completion_text_field() {
    let d = decode(Endpoint::Completion, &[r#"data: {"choices":[{"text":"Hi"}]}"#, "data: [DONE]"]);
    assert_eq!(d.text(), "Hi");
    assert_eq!(d.state().chunk_count, 1);
}

#[test]
fn chat_falls_back_to_message_content() {
    let d = decode(Endpoint::Chat, &[
        r#"data: {"choices":[{"message":{"content":"X"}}]}"#,
        r#"data: {"choices":[{"delta":{"content":null},"message":{"content":"Y"}}]}"#,
    ]);
    assert_eq!(d.text(), "XY");
    assert!(!d.is_finished());
}

#[test]
fn lines_after_done_are_dropped() {
    let mut d = decode(Endpoint::Chat, &[r#"data: {"choices":[{"delta":{"content":"a"}}]}"#, "data: [DONE]"]);
    let before = d.state().clone();
    assert!(!d.feed_line(r#"data: {"choices":[{"delta":{"content":"b"}}]}"#));
    assert!(!d.feed_line("data: not json"));
    assert_eq!(d.state(), &before);
    assert_eq!(d.text(), "a");
}

#[test]
fn malformed_json_is_skipped() {
    let d = decode(Endpoint::Chat, &[
        r#"data: {"choices":[{"delta":{"content":"ok"}}]}"#,
        r#"data: {"choices":[{"delta":{"cont"#,
        r#"data: {"choices":[{"delta":{"content":"!"}}]}"#,
        "data: [DONE]",
    ]);
    assert_eq!(d.text(), "ok!");
    assert_eq!(d.state().chunk_count, 2);
    assert_eq!(d.state().parse_error_count, 1);
}

#[test]
fn empty_and_reasoning_deltas_do_not_append() {
    let d = decode(Endpoint::Chat, &[
        r#"data: {"choices":[{"delta":{"role":"assistant","content":""}}]}"#,
        r#"data: {"choices":[{"delta":{"reasoning_content":"thinking..."}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"answer"}}]}"#,
        r#"data: {"choices":[]}"#,
        "data: [DONE]",
    ]);
    assert_eq!(d.text(), "answer");
    assert_eq!(d.state().chunk_count, 1);
    assert_eq!(d.state().empty_content_count, 2);
}

#[test]
fn non_data_lines_are_ignored() {
    let d = decode(Endpoint::Completion, &[
        ": keep-alive",
        "event: message",
        "id: 7",
        r#"data: {"choices":[{"text":" spaced "}]}"#,
    ]);
    assert_eq!(d.text(), " spaced ");
    assert_eq!(d.state().total_lines_seen, 4);
}

#[test]
fn classify_tags_each_line() {
    assert_eq!(classify("", Endpoint::Chat), Frame::Blank);
    assert_eq!(classify("data:[DONE]", Endpoint::Chat), Frame::Ignored);
    assert_eq!(classify("data:  [DONE]  ", Endpoint::Chat), Frame::Done);
    assert_eq!(classify("data: 42", Endpoint::Chat), Frame::NoContent);
    assert_eq!(classify(r#"data: {"choices":[{"text":""}]}"#, Endpoint::Completion), Frame::NoContent);
    assert!(matches!(classify("data: {", Endpoint::Completion), Frame::Malformed(_)));
}

#[test]
fn line_buffer_joins_split_frames() {
    let mut buf = LineBuffer::new();
    let mut d = StreamDecoder::new(Endpoint::Chat);
    let stream = "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9}\"}}]}\r\n\r\ndata: [DONE]\r\n";
    let bytes = stream.as_bytes();
    // split inside the JSON and inside the two-byte 'é'
    let e_acute = stream.find('\u{e9}').unwrap();
    for chunk in [&bytes[..20], &bytes[20..e_acute + 1], &bytes[e_acute + 1..]] {
        d.feed_lines(buf.push(chunk));
    }
    assert_eq!(d.text(), "caf\u{e9}");
    assert!(d.is_finished());
    assert_eq!(d.state().parse_error_count, 0);
    assert!(buf.finish().is_none());
}

#[test]
fn line_buffer_flushes_unterminated_tail() {
    let mut buf = LineBuffer::new();
    assert!(buf.push(b"data: {\"choices\"").is_empty());
    assert!(buf.push(b":[{\"text\":\"z\"}]}").is_empty());
    assert_eq!(buf.finish().as_deref(), Some("data: {\"choices\":[{\"text\":\"z\"}]}"));
    assert!(buf.finish().is_none());
}

#[test]
fn debug_mode_does_not_change_decoding() {
    let lines = [
        r#"data: {"choices":[{"delta":{"content":"a"}}]}"#,
        "data: {broken",
        r#"data: {"choices":[{"delta":{"content":"b"}}]}"#,
        "data: [DONE]",
    ];
    let mut quiet = StreamDecoder::new(Endpoint::Chat);
    let mut loud = StreamDecoder::new(Endpoint::Chat).with_debug(true);
    quiet.feed_lines(lines);
    loud.feed_lines(lines);
    assert_eq!(quiet.finish(), loud.finish());
}
