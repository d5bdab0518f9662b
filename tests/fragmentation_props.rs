// Property tests: output must not depend on how input is fragmented
// Author: kelexine (https://github.com/kelexine)

use nim2claude::translation::{Channel, ThinkSplitter};
use nim2claude::upstream::sse::{Frame, FrameReader};
use proptest::prelude::*;
use serde_json::json;

/// Concatenate output per channel. Adjacent segments of one channel may be
/// split differently, but their joined text must match.
fn run_splitter(fragments: &[&str]) -> Vec<(Channel, String)> {
    let mut splitter = ThinkSplitter::default();
    let mut merged: Vec<(Channel, String)> = Vec::new();
    let segments = fragments
        .iter()
        .flat_map(|f| splitter.push(f))
        .collect::<Vec<_>>()
        .into_iter()
        .chain(splitter.flush());
    for (channel, text) in segments {
        match merged.last_mut() {
            Some((last, acc)) if *last == channel => acc.push_str(&text),
            _ => merged.push((channel, text)),
        }
    }
    merged
}

/// Cut `text` at the given (char-aligned) positions.
fn cut<'a>(text: &'a str, cuts: &[usize]) -> Vec<&'a str> {
    let mut points: Vec<usize> = cuts
        .iter()
        .map(|c| c % (text.len() + 1))
        .filter(|&c| text.is_char_boundary(c))
        .collect();
    points.push(0);
    points.push(text.len());
    points.sort_unstable();
    points.dedup();
    points.windows(2).map(|w| &text[w[0]..w[1]]).collect()
}

fn piece() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("<think>".to_string()),
        Just("</think>".to_string()),
        Just("<".to_string()),
        Just("</th".to_string()),
        "[a-z \u{e9}\u{4e2d}]{0,6}",
    ]
}

proptest! {
    #[test]
    fn splitter_is_fragmentation_independent(
        pieces in prop::collection::vec(piece(), 0..12),
        cuts in prop::collection::vec(any::<usize>(), 0..10),
    ) {
        let text: String = pieces.concat();
        let whole = run_splitter(&[text.as_str()]);
        let fragmented = run_splitter(&cut(&text, &cuts));
        prop_assert_eq!(whole, fragmented);
    }

    #[test]
    fn splitter_never_holds_more_than_a_tag(
        pieces in prop::collection::vec(piece(), 0..12),
    ) {
        let mut splitter = ThinkSplitter::default();
        for p in &pieces {
            splitter.push(p);
            prop_assert!(splitter.pending_len() < "</think>".len());
        }
    }

    #[test]
    fn splitter_preserves_untagged_text(text in "[a-z<>/ \u{e9}]{0,40}") {
        prop_assume!(!text.contains("<think>"));
        let output = run_splitter(&[text.as_str()]);
        let visible: String = output.into_iter().map(|(_, t)| t).collect();
        prop_assert_eq!(visible, text);
    }

    #[test]
    fn frame_reader_is_fragmentation_independent(
        contents in prop::collection::vec("[a-z \u{e9}\u{1F600}<>]{0,8}", 1..6),
        cuts in prop::collection::vec(any::<usize>(), 0..16),
    ) {
        let mut body = String::new();
        for c in &contents {
            body.push_str(&format!("data: {}\n\n", json!({"choices": [{"delta": {"content": c}}]})));
        }
        body.push_str("data: [DONE]\n\n");
        let bytes = body.as_bytes();

        // Byte-level cuts, deliberately ignoring UTF-8 boundaries
        let mut points: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
        points.push(0);
        points.push(bytes.len());
        points.sort_unstable();
        points.dedup();

        let mut reader = FrameReader::new();
        let mut seen = Vec::new();
        let mut done = false;
        for w in points.windows(2) {
            for frame in reader.push(&bytes[w[0]..w[1]]) {
                match frame {
                    Frame::Chunk(chunk) => seen.push(
                        chunk.first_choice().and_then(|c| c.delta.content.clone()).unwrap_or_default(),
                    ),
                    Frame::Done => done = true,
                }
            }
        }

        prop_assert!(done);
        prop_assert_eq!(seen, contents);
        prop_assert_eq!(reader.malformed_frames(), 0);
    }
}
