//! SSE plumbing for the Gemini streaming endpoint.
//!
//! Gemini sends data-only events (`data: {...}` followed by a blank line,
//! no `event:` prefix). Network chunks can split both events and UTF-8
//! sequences, so bytes are accumulated until they decode cleanly.

/// Move the longest valid UTF-8 prefix of `pending` into `out`.
///
/// An incomplete multi-byte sequence at the end stays in `pending` for the
/// next chunk. Genuinely invalid bytes are replaced rather than stalling.
pub fn push_utf8(pending: &mut Vec<u8>, out: &mut String) {
    loop {
        match std::str::from_utf8(pending) {
            Ok(s) => {
                out.push_str(s);
                pending.clear();
                return;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    // Truncated sequence — wait for more bytes.
                    None => {
                        pending.drain(..valid);
                        return;
                    }
                    Some(bad) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + bad);
                    }
                }
            }
        }
    }
}

/// Drain every complete event from `buffer`, returning their data payloads.
///
/// Multi-line `data:` fields are joined with `\n`. Events with no data
/// (comments, keep-alives) are skipped.
pub fn parse_data_only_sse_events(buffer: &mut String) -> Vec<String> {
    let mut events = Vec::new();
    while let Some((end, sep_len)) = find_event_boundary(buffer) {
        let raw: String = buffer.drain(..end + sep_len).collect();
        if let Some(data) = event_data(&raw[..end]) {
            events.push(data);
        }
    }
    events
}

/// Treat whatever is left in `buffer` as a final, unterminated event.
pub fn flush_sse_events(buffer: &mut String) -> Vec<String> {
    let mut events = parse_data_only_sse_events(buffer);
    let rest = std::mem::take(buffer);
    if let Some(data) = event_data(&rest) {
        events.push(data);
    }
    events
}

fn find_event_boundary(buffer: &str) -> Option<(usize, usize)> {
    let lf = buffer.find("\n\n").map(|i| (i, 2));
    let crlf = buffer.find("\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn event_data(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();
    if lines.is_empty() {
        return None;
    }
    let data = lines.join("\n");
    (!data.trim().is_empty()).then_some(data)
}
