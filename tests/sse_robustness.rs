//! Property tests for the SSE frame parser.
//!
//! The decoder must produce identical payloads regardless of how the byte
//! stream is chunked by the network.

use promptpit::sse::SseParser;
use proptest::prelude::*;

fn feed_all(parser: &mut SseParser, bytes: &[u8], cuts: &[usize]) -> Vec<String> {
    let mut payloads = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        let end = cut.min(bytes.len()).max(start);
        payloads.extend(parser.feed(&bytes[start..end]));
        start = end;
    }
    payloads.extend(parser.feed(&bytes[start..]));
    payloads
}

proptest! {
    #[test]
    fn split_points_do_not_change_payloads(
        payloads in proptest::collection::vec("[a-zA-Z0-9 {}:\",]{1,40}", 1..8),
        cuts in proptest::collection::vec(0usize..400, 0..10),
    ) {
        let mut body = String::new();
        for p in &payloads {
            body.push_str(&format!("data: {}\n\n", p));
        }
        let bytes = body.as_bytes();

        let mut whole = SseParser::new();
        let expected = whole.feed(bytes);

        let mut sorted_cuts = cuts.clone();
        sorted_cuts.sort_unstable();
        let mut split = SseParser::new();
        let actual = feed_all(&mut split, bytes, &sorted_cuts);

        prop_assert_eq!(expected, actual);
    }

    #[test]
    fn multibyte_content_survives_arbitrary_splits(
        cut in 1usize..60,
    ) {
        let body = "data: {\"content\":\"héllo wörld 日本語\"}\n\ndata: done\n\n";
        let bytes = body.as_bytes();
        let cut = cut.min(bytes.len());

        let mut parser = SseParser::new();
        let mut payloads = parser.feed(&bytes[..cut]);
        payloads.extend(parser.feed(&bytes[cut..]));

        prop_assert_eq!(payloads.len(), 2);
        prop_assert!(payloads[0].contains("héllo wörld 日本語"));
    }
}

#[test]
fn crlf_frames_decode() {
    let mut parser = SseParser::new();
    let payloads = parser.feed(b"data: one\r\n\r\ndata: two\r\n\r\n");
    assert_eq!(payloads, vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn incomplete_frame_stays_pending() {
    let mut parser = SseParser::new();
    let payloads = parser.feed(b"data: partial");
    assert!(payloads.is_empty());
    assert!(parser.pending() > 0);
}
