//! Tests for the structured parser

use crate::{Charset, Facility, Severity, StructuredMessageParser, parse};

#[test]
fn test_parse_well_formed() {
    let input = r#"<165> 2003-10-11T22:14:15.003Z hostname appname process-id message-id [id@1234 test1="test2"] test3"#;
    let event = parse(input.as_bytes());

    assert!(event.structured);
    assert_eq!(event.facility, Some(Facility::Local4));
    assert_eq!(event.severity, Some(Severity::Notice));
    assert_eq!(event.host.as_deref(), Some("hostname"));
    assert_eq!(event.app_name.as_deref(), Some("appname"));
    assert_eq!(event.proc_id.as_deref(), Some("process-id"));
    assert_eq!(event.msg_id.as_deref(), Some("message-id"));
    assert_eq!(event.sd_param("id@1234", "test1"), Some("test2"));
    assert_eq!(event.message, "test3");
    assert!(event.timestamp.is_some());
}

#[test]
fn test_parse_malformed_falls_back() {
    let input = "3 junk ab [ [ ]";
    let event = parse(input.as_bytes());

    assert!(!event.structured);
    assert_eq!(event.message, input);
    assert!(event.structured_data.is_empty());
    assert!(event.host.is_none());
    assert!(event.app_name.is_none());
}

#[test]
fn test_parse_unbalanced_sd_falls_back() {
    let input = r#"<13>1 - host app 1 id [a k="v" rest"#;
    let event = parse(input.as_bytes());

    assert!(!event.structured);
    assert_eq!(event.message, input);
    // PRI survives the fallback
    assert_eq!(event.facility, Some(Facility::User));
    assert_eq!(event.severity, Some(Severity::Notice));
}

#[test]
fn test_parse_version_and_nil_fields() {
    let event = parse(b"<34>1 - - - - - - hello");

    assert!(event.structured);
    assert_eq!(event.version, Some(1));
    assert!(event.timestamp.is_none());
    assert!(event.host.is_none());
    assert!(event.structured_data.is_empty());
    assert_eq!(event.message, "hello");
}

#[test]
fn test_parse_escaped_values() {
    let input = r#"<165>1 - h a p m [x q="a\"b" s="c\\d" r="e\]f" o="g\nh"] msg"#;
    let event = parse(input.as_bytes());

    assert!(event.structured);
    assert_eq!(event.sd_param("x", "q"), Some("a\"b"));
    assert_eq!(event.sd_param("x", "s"), Some("c\\d"));
    assert_eq!(event.sd_param("x", "r"), Some("e]f"));
    assert_eq!(event.sd_param("x", "o"), Some("g\\nh"));
}

#[test]
fn test_parse_repeated_sd_id_last_wins() {
    let input = r#"<165>1 - h a p m [dup a="1"][other z="9"][dup b="2"] body"#;
    let event = parse(input.as_bytes());

    assert_eq!(event.structured_data.len(), 2);
    assert_eq!(event.sd_param("dup", "a"), None);
    assert_eq!(event.sd_param("dup", "b"), Some("2"));
    assert_eq!(event.sd_param("other", "z"), Some("9"));
    assert_eq!(event.message, "body");
}

#[test]
fn test_parse_no_sd_remainder_is_message() {
    let event = parse(b"<165>1 - h a p m plain text here");

    assert!(event.structured);
    assert!(event.structured_data.is_empty());
    assert_eq!(event.message, "plain text here");
}

#[test]
fn test_parse_strips_bom() {
    let event = parse("<165>1 - h a p m - \u{FEFF}hi".as_bytes());
    assert_eq!(event.message, "hi");
}

#[test]
fn test_parse_bsd_line_is_raw() {
    let input = "<13>Oct 11 22:14:15 host app: message";
    let event = parse(input.as_bytes());

    assert!(!event.structured);
    assert_eq!(event.message, input);
    assert_eq!(event.facility, Some(Facility::User));
}

#[test]
fn test_parse_out_of_range_pri_is_text() {
    let input = "<192>1 - h a p m - x";
    let event = parse(input.as_bytes());

    assert!(event.facility.is_none());
    assert!(!event.structured);
    assert_eq!(event.message, input);
}

#[test]
fn test_parse_empty_input() {
    let event = parse(b"");
    assert!(!event.structured);
    assert_eq!(event.message, "");
}

#[test]
fn test_parser_uses_charset() {
    let parser = StructuredMessageParser::new(Charset::Latin1);
    let event = parser.parse(&[b'<', b'1', b'4', b'>', b'c', b'a', b'f', 0xE9]);
    assert_eq!(event.message, "<14>café");
}
