use chat_stream::{DeltaAccumulator, LineDecoder, StreamFrame};

/// Drives decoder + frame classification over one chunk partition and
/// collects Data payloads in order, honoring the terminator.
fn collect_payloads(chunks: &[&[u8]]) -> Vec<String> {
    let mut decoder = LineDecoder::default();
    let mut payloads = Vec::new();

    'stream: for chunk in chunks {
        for line in decoder.feed(chunk) {
            match StreamFrame::classify(&line) {
                Some(StreamFrame::Data(payload)) => payloads.push(payload),
                Some(StreamFrame::Terminator) => break 'stream,
                _ => {}
            }
        }
    }

    payloads
}

const WELL_FORMED_STREAM: &str = concat!(
    ": heartbeat\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"h\\u00e9llo \"}}]}\r\n",
    "\n",
    "event: noise\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"w\u{f6}rld\"}}]}\n",
    "data: [DONE]\n",
);

#[test]
fn every_byte_partition_yields_identical_payloads() {
    let bytes = WELL_FORMED_STREAM.as_bytes();
    let whole = collect_payloads(&[bytes]);
    assert_eq!(whole.len(), 2);

    // Byte-at-a-time splits every line and every multi-byte character.
    let byte_at_a_time: Vec<&[u8]> = bytes.chunks(1).collect();
    assert_eq!(collect_payloads(&byte_at_a_time), whole);

    // Sweep a range of fixed chunk sizes for odd boundary alignments.
    for size in 2..=17 {
        let chunks: Vec<&[u8]> = bytes.chunks(size).collect();
        assert_eq!(collect_payloads(&chunks), whole, "chunk size {size}");
    }
}

#[test]
fn terminator_stops_processing_even_with_trailing_data_frames() {
    let stream = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"kept\"}}]}\n",
        "data: [DONE]\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"dropped\"}}]}\n",
    );

    let payloads = collect_payloads(&[stream.as_bytes()]);
    assert_eq!(payloads.len(), 1);
    assert!(payloads[0].contains("kept"));
}

#[test]
fn two_deltas_assemble_one_message() {
    let stream = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
        "data: [DONE]\n",
    );

    let mut accumulator = DeltaAccumulator::default();
    let mut observed = Vec::new();
    for payload in collect_payloads(&[stream.as_bytes()]) {
        if accumulator.apply(&payload) {
            observed.push(accumulator.text().to_string());
        }
    }

    assert_eq!(accumulator.text(), "Hello");
    assert_eq!(observed, vec!["Hel".to_string(), "Hello".to_string()]);
}

#[test]
fn accumulation_is_pure_append_of_deltas_in_order() {
    let first = r#"{"choices":[{"delta":{"content":"ab"}}]}"#;
    let second = r#"{"choices":[{"delta":{"content":"cd"}}]}"#;

    let mut split_runs = String::new();
    for payloads in [[first], [second]] {
        let mut accumulator = DeltaAccumulator::default();
        for payload in payloads {
            accumulator.apply(payload);
        }
        split_runs.push_str(accumulator.text());
    }

    let mut single_run = DeltaAccumulator::default();
    single_run.apply(first);
    single_run.apply(second);

    assert_eq!(split_runs, single_run.text());
}

#[test]
fn malformed_frames_do_not_abort_the_stream() {
    let stream = concat!(
        "data: {not json\n",
        "data: {\"choices\":[{\"delta\":{}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
        "data: [DONE]\n",
    );

    let mut accumulator = DeltaAccumulator::default();
    for payload in collect_payloads(&[stream.as_bytes()]) {
        accumulator.apply(&payload);
    }

    assert_eq!(accumulator.text(), "ok");
}
