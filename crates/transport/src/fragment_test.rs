use super::*;

fn fragmenter(max: usize) -> Fragmenter {
    Fragmenter::new(max, b"...", b"...").unwrap()
}

fn reassembler() -> Reassembler<u32> {
    Reassembler::new(b"...", b"...", 4096)
}

#[test]
fn test_short_payload_is_one_datagram() {
    let parts = fragmenter(32).split(b"hello");
    assert_eq!(parts, vec![Bytes::from_static(b"hello")]);
}

#[test]
fn test_exact_limit_is_not_split() {
    let payload = vec![b'x'; 32];
    assert_eq!(fragmenter(32).split(&payload).len(), 1);
}

#[test]
fn test_fragment_shapes() {
    let payload: Vec<u8> = (0..40u8).map(|i| b'a' + (i % 26)).collect();
    let parts = fragmenter(16).split(&payload);

    assert!(parts.len() >= 3);
    assert!(parts.iter().all(|p| p.len() <= 16));

    let first = &parts[0];
    assert!(!first.starts_with(b"..."));
    assert!(first.ends_with(b"..."));

    for middle in &parts[1..parts.len() - 1] {
        assert!(middle.starts_with(b"..."));
        assert!(middle.ends_with(b"..."));
    }

    let last = parts.last().unwrap();
    assert!(last.starts_with(b"..."));
}

#[test]
fn test_rejects_markers_filling_limit() {
    assert!(Fragmenter::new(6, b"...", b"...").is_err());
    assert!(Fragmenter::new(7, b"...", b"...").is_ok());
}

#[test]
fn test_split_then_reassemble() {
    let payload = b"<14>Oct 11 22:14:15 host app: a message that will not fit in one datagram";
    let parts = fragmenter(20).split(payload);
    assert!(parts.len() > 2);

    let mut r = reassembler();
    let mut out = Vec::new();
    for part in &parts {
        out.extend(r.push(&1, part));
    }

    assert_eq!(out, vec![Bytes::copy_from_slice(payload)]);
    assert_eq!(r.pending_len(), 0);
}

#[test]
fn test_peers_are_independent() {
    let a = fragmenter(12).split(b"first peer message body");
    let b = fragmenter(12).split(b"second peer message body");

    let mut r = reassembler();
    let mut out = Vec::new();
    for (x, y) in a.iter().zip(b.iter()) {
        out.extend(r.push(&1, x));
        out.extend(r.push(&2, y));
    }
    for x in a.iter().skip(b.len()) {
        out.extend(r.push(&1, x));
    }
    for y in b.iter().skip(a.len()) {
        out.extend(r.push(&2, y));
    }

    out.sort();
    assert_eq!(
        out,
        vec![
            Bytes::from_static(b"first peer message body"),
            Bytes::from_static(b"second peer message body"),
        ]
    );
}

#[test]
fn test_plain_datagram_passes_through() {
    let mut r = reassembler();
    assert_eq!(r.push(&1, b"<13>plain"), vec![Bytes::from_static(b"<13>plain")]);
}

#[test]
fn test_orphan_continuation_is_unchanged() {
    let mut r = reassembler();
    assert_eq!(
        r.push(&1, b"...tail end"),
        vec![Bytes::from_static(b"...tail end")]
    );
}

#[test]
fn test_abandoned_buffer_is_flushed_raw() {
    let mut r = reassembler();
    assert!(r.push(&1, b"head part...").is_empty());

    let out = r.push(&1, b"unrelated");
    assert_eq!(
        out,
        vec![
            Bytes::from_static(b"head part..."),
            Bytes::from_static(b"unrelated"),
        ]
    );
    assert_eq!(r.pending_len(), 0);
}

#[test]
fn test_overflow_is_flushed_raw() {
    let mut r = Reassembler::new(b"...", b"...", 10);
    assert!(r.push(&1, b"0123456...").is_empty());

    let out = r.push(&1, b"...789abcdef");
    assert_eq!(out, vec![Bytes::from_static(b"0123456......789abcdef")]);
}

#[test]
fn test_expire_and_drain() {
    let mut r = reassembler();
    assert!(r.push(&1, b"stuck...").is_empty());
    assert!(r.push(&2, b"also stuck...").is_empty());

    assert!(r.expire(Duration::from_secs(3600)).is_empty());
    let mut expired = r.expire(Duration::ZERO);
    expired.sort();
    assert_eq!(
        expired,
        vec![
            (1, Bytes::from_static(b"stuck...")),
            (2, Bytes::from_static(b"also stuck...")),
        ]
    );

    assert!(r.push(&3, b"again...").is_empty());
    assert_eq!(r.drain(), vec![(3, Bytes::from_static(b"again..."))]);
}
