//! Integration tests for the IMAP core.
//!
//! A mock stream plays back canned server output so that whole sessions
//! run without a server; the BODYSTRUCTURE fixtures are shapes seen from
//! real mailers.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use webmail_imap::parser::Lexer;
use webmail_imap::{
    Classification, Client, ContentFormat, Credentials, MessageItems, QueuedConnector,
    ResponseParser, Session, SessionState, Value,
};

/// Mock stream that returns predefined responses.
struct MockStream {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Captured commands sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = self.responses.position() as usize;

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn classify(wire: &[u8]) -> Classification {
    let structure = Value::parse(&mut Lexer::new(wire)).unwrap();
    Classification::classify(&structure).unwrap()
}

fn paths<'a>(parts: impl IntoIterator<Item = &'a webmail_imap::PartDescriptor>) -> Vec<&'a str> {
    parts.into_iter().map(|part| part.path.as_str()).collect()
}

const PLAIN: &str = r#"("TEXT" "PLAIN" ("CHARSET" "us-ascii") NIL NIL "7BIT" 120 4 NIL NIL NIL NIL)"#;
const HTML: &str = r#"("TEXT" "HTML" ("CHARSET" "utf-8") NIL NIL "QUOTED-PRINTABLE" 900 20 NIL NIL NIL NIL)"#;

/// `Caf\u{e9} cr\u{e8}me` in Latin-1.
const LATIN1_SUBJECT: &[u8] = b"Caf\xe9 cr\xe8me";

/// A forwarded message whose envelope subject arrives as an 8-bit literal.
fn forwarded_structure() -> Vec<u8> {
    let mut wire = Vec::new();
    wire.extend_from_slice(PLAIN.as_bytes());
    wire.extend_from_slice(br#"("MESSAGE" "RFC822" NIL NIL NIL "7BIT" 2048 (NIL "#);
    wire.extend_from_slice(format!("{{{}}}\r\n", LATIN1_SUBJECT.len()).as_bytes());
    wire.extend_from_slice(LATIN1_SUBJECT);
    wire.extend_from_slice(
        br#" NIL NIL NIL NIL NIL NIL NIL NIL) ("TEXT" "PLAIN" NIL NIL NIL "7BIT" 10 1) 48 NIL NIL NIL NIL)"#,
    );
    let mut structure = b"(".to_vec();
    structure.extend_from_slice(&wire);
    structure.extend_from_slice(br#" "MIXED")"#);
    structure
}

#[test]
fn test_parser_capability() {
    let response = b"* CAPABILITY IMAP4rev1 SORT QUOTA LIST-EXTENDED\r\n";
    let parsed = ResponseParser::parse(response).unwrap();

    match parsed {
        webmail_imap::Response::Untagged(webmail_imap::parser::UntaggedResponse::Capability(
            caps,
        )) => {
            assert!(caps.contains(&webmail_imap::Capability::Sort));
            assert!(caps.contains(&webmail_imap::Capability::ListExtended));
        }
        _ => panic!("Expected capability response"),
    }
}

#[test]
fn test_parser_list_response_with_extended_data() {
    let response = b"* LIST (\\HasChildren) \"/\" \"Lists\" (\"CHILDINFO\" (\"SUBSCRIBED\"))\r\n";
    let parsed = ResponseParser::parse(response).unwrap();

    match parsed {
        webmail_imap::Response::Untagged(webmail_imap::parser::UntaggedResponse::List(list)) => {
            assert_eq!(list.mailbox.as_str(), "Lists");
            assert_eq!(list.delimiter, Some('/'));
        }
        _ => panic!("Expected LIST response"),
    }
}

#[tokio::test]
async fn test_client_greeting() {
    let (stream, _) = MockStream::new(b"* OK IMAP4rev1 Service Ready\r\n");
    let client = Client::from_stream(stream).await;
    assert!(client.is_ok());
}

#[test]
fn test_single_html_part() {
    let classification = classify(HTML.as_bytes());
    assert_eq!(paths(&classification.contents[&ContentFormat::Html]), ["1"]);
    assert!(classification.contents.get(&ContentFormat::Plain).is_none());
    assert_eq!(
        classification.preferred_format(ContentFormat::Plain),
        Some(ContentFormat::Html)
    );
}

#[test]
fn test_two_plain_parts() {
    let wire = format!(r#"({PLAIN}{PLAIN} "MIXED")"#);
    let classification = classify(wire.as_bytes());
    assert_eq!(paths(&classification.contents[&ContentFormat::Plain]), ["1"]);
    assert_eq!(paths(&classification.attachments), ["2"]);
}

#[test]
fn test_related_alternative_with_cids() {
    let logo = r#"("IMAGE" "PNG" ("NAME" "logo.png") "<logo.1@mailer>" NIL "BASE64" 4000 NIL ("INLINE" ("FILENAME" "logo.png")) NIL NIL)"#;
    let banner = r#"("IMAGE" "JPEG" NIL "<banner@mailer>" NIL "BASE64" 9000 NIL NIL NIL NIL)"#;
    let report = r#"("APPLICATION" "PDF" ("NAME" "report.pdf") NIL NIL "BASE64" 70000 NIL ("ATTACHMENT" ("FILENAME" "report.pdf")) NIL NIL)"#;
    let wire = format!(
        r#"((({PLAIN}{HTML} "ALTERNATIVE"){logo}{banner} "RELATED"){report} "MIXED")"#
    );
    let classification = classify(wire.as_bytes());

    assert_eq!(paths(&classification.contents[&ContentFormat::Plain]), ["1.1.1"]);
    assert_eq!(paths(&classification.contents[&ContentFormat::Html]), ["1.1.2"]);
    assert_eq!(classification.inlines["logo.1@mailer"].path, "1.2");
    assert_eq!(classification.inlines["banner@mailer"].path, "1.3");
    assert_eq!(paths(&classification.attachments), ["2"]);
    assert_eq!(classification.attachments[0].filename, "report.pdf");
}

#[test]
fn test_four_levels_of_mixed() {
    let leaf = r#"("APPLICATION" "OCTET-STREAM" NIL NIL NIL "BASE64" 10 NIL NIL NIL NIL)"#;
    let wire = format!(
        r#"({PLAIN}(({leaf}(({leaf} "MIXED"){leaf} "MIXED") "MIXED"){leaf} "MIXED") "MIXED")"#
    );
    let classification = classify(wire.as_bytes());

    assert_eq!(
        paths(&classification.attachments),
        ["2.1.1", "2.1.2.1.1", "2.1.2.2", "2.2"]
    );
    assert_eq!(classification.attachments[1].filename, "part_2.1.2.1.1");
}

#[test]
fn test_rfc2231_and_rfc2047_filenames() {
    let extended = r#"("APPLICATION" "PDF" ("NAME*" "iso-8859-1'fr'r%E9sum%E9.pdf") NIL NIL "BASE64" 10 NIL NIL NIL NIL)"#;
    let continued = r#"("TEXT" "CSV" NIL NIL NIL "BASE64" 10 3 NIL ("ATTACHMENT" ("FILENAME*0*" "utf-8''quarterly%20" "FILENAME*1" "figures.csv")) NIL NIL)"#;
    let encoded = r#"("IMAGE" "PNG" ("NAME" "=?UTF-8?B?0YTQvtGC0L4ucG5n?=") NIL NIL "BASE64" 10 NIL NIL NIL NIL)"#;
    let wire = format!(r#"({PLAIN}{extended}{continued}{encoded} "MIXED")"#);
    let classification = classify(wire.as_bytes());

    let names: Vec<&str> = classification
        .attachments
        .iter()
        .map(|part| part.filename.as_str())
        .collect();
    assert_eq!(
        names,
        ["r\u{e9}sum\u{e9}.pdf", "quarterly figures.csv", "\u{444}\u{43e}\u{442}\u{43e}.png"]
    );
}

#[test]
fn test_latin1_literal_filename() {
    let mut wire = br#"("APPLICATION" "OCTET-STREAM" ("NAME" {10}"#.to_vec();
    wire.extend_from_slice(b"\r\nr\xe9sum\xe9.txt");
    wire.extend_from_slice(br#") NIL NIL "BASE64" 10 NIL NIL NIL NIL)"#);
    let classification = classify(&wire);
    assert_eq!(classification.attachments[0].filename, "r\u{e9}sum\u{e9}.txt");
}

#[test]
fn test_forwarded_message_is_a_leaf() {
    let classification = classify(&forwarded_structure());
    assert_eq!(classification.parts().count(), 2);

    let forwarded = classification.find_attachment("2").unwrap();
    assert_eq!(forwarded.mime_type, "message/rfc822");
    assert_eq!(forwarded.text_lines, Some(48));
    assert_eq!(forwarded.filename, "part_2");
    let envelope = forwarded.envelope.as_ref().unwrap().as_list().unwrap();
    assert_eq!(envelope[1].as_bytes(), Some(LATIN1_SUBJECT));
}

#[tokio::test]
async fn test_session_lists_then_reads_a_message() {
    let mut fetch = b"* 1 FETCH (UID 9 BODYSTRUCTURE ".to_vec();
    fetch.extend_from_slice(&forwarded_structure());
    fetch.extend_from_slice(b")\r\n");

    let mut server = Vec::new();
    server.extend_from_slice(b"* OK ready\r\n");
    server.extend_from_slice(b"A0001 OK [CAPABILITY IMAP4rev1 SORT QUOTA] Logged in\r\n");
    server.extend_from_slice(b"* 2 EXISTS\r\nA0002 OK [READ-WRITE] selected\r\n");
    server.extend_from_slice(b"* SORT 9 5\r\nA0003 OK sorted\r\n");
    server.extend_from_slice(b"* QUOTAROOT INBOX \"\"\r\n* QUOTA \"\" (STORAGE 250 1000)\r\n");
    server.extend_from_slice(b"A0004 OK done\r\n");
    server.extend_from_slice(&fetch);
    server.extend_from_slice(b"A0005 OK fetched\r\n");
    server.extend_from_slice(b"A0006 OK checked\r\n");
    server.extend_from_slice(b"* BYE see you\r\nA0007 OK logged out\r\n");

    let (stream, sent) = MockStream::new(&server);
    let connector = QueuedConnector::new([stream]);
    let mut session = Session::open(connector, Credentials::new("alice", "secret"))
        .await
        .unwrap();

    assert_eq!(session.messages_count("INBOX", "-date", None).await.unwrap(), 2);
    assert_eq!(session.quota().unwrap().usage, 25);

    let record = session
        .fetch_message("INBOX", 9, &MessageItems::BodyStructure, true)
        .await
        .unwrap()
        .unwrap();
    let classification = Classification::classify(record.body_structure().unwrap()).unwrap();
    assert!(classification.has_attachments());

    session.logout().await.unwrap();
    assert_eq!(*session.state(), SessionState::LoggedOut);

    let sent = String::from_utf8(sent.lock().unwrap().clone()).unwrap();
    let commands: Vec<&str> = sent.lines().collect();
    assert_eq!(
        commands,
        [
            "A0001 LOGIN alice secret",
            "A0002 SELECT \"INBOX\"",
            "A0003 UID SORT (REVERSE DATE) UTF-8 NOT DELETED",
            "A0004 GETQUOTAROOT \"INBOX\"",
            "A0005 UID FETCH 9 (UID BODYSTRUCTURE)",
            "A0006 CHECK",
            "A0007 LOGOUT",
        ]
    );
}
