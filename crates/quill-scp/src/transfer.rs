//! Sink side of the scp wire protocol.
//!
//! ```text
//! [optional] T<mtime> 0 <atime> 0\n
//! C<4-digit-octal-mode> <decimal-size> <name>\n
//! <size raw bytes>
//! \x00
//! ```
//!
//! The sink answers with a single NUL byte when it is ready, after every
//! accepted header line, and after every complete file.

use std::sync::LazyLock;

use quill_core::Deadline;
use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Longest header line accepted, newline included
pub const MAX_LINE_LEN: usize = 4096;

const ACK: &[u8] = b"\x00";

static CONTROL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^C([0-7]{4}) ([0-9]+) (.+)$").expect("valid control regex"));
static TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^T([0-9]+) 0 ([0-9]+) 0$").expect("valid timestamp regex"));

/// One file pulled off the wire, fully buffered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    /// Target path joined with `name`
    pub filepath: String,
    /// Permission bits
    pub mode: u32,
    pub size: u64,
    pub content: Vec<u8>,
    pub mtime: Option<i64>,
    pub atime: Option<i64>,
}

/// Where the receiver is within the current file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    AwaitTimestampOrControl,
    AwaitControl,
    ReadPayload,
    AwaitAck,
    Done,
    Error,
}

#[derive(Debug, PartialEq, Eq)]
struct Control {
    mode: u32,
    size: u64,
    name: String,
}

/// Pulls files off an scp sink session, one at a time
pub struct TransferReceiver<R, W> {
    reader: R,
    writer: W,
    target: String,
    max_file_size: u64,
    deadline: Deadline,
    state: ReceiverState,
}

impl<R, W> TransferReceiver<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        reader: R,
        writer: W,
        target: impl Into<String>,
        max_file_size: u64,
        deadline: Deadline,
    ) -> Self {
        Self {
            reader,
            writer,
            target: target.into(),
            max_file_size,
            deadline,
            state: ReceiverState::AwaitTimestampOrControl,
        }
    }

    pub const fn state(&self) -> ReceiverState {
        self.state
    }

    /// Tell the client the sink is ready for the first header.
    pub async fn ready(&mut self) -> Result<(), ProtocolError> {
        let result = self.ack().await;
        self.track(result)
    }

    /// Receive the next file.
    ///
    /// Returns `Ok(None)` when the client closes the stream between files.
    /// After an error the receiver stays failed; no partial file is ever
    /// returned.
    pub async fn next_file(&mut self) -> Result<Option<FileEntry>, ProtocolError> {
        if self.state == ReceiverState::Error {
            return Err(ProtocolError::Aborted);
        }
        let result = self.receive().await;
        self.track(result)
    }

    fn track<T>(&mut self, result: Result<T, ProtocolError>) -> Result<T, ProtocolError> {
        if result.is_err() {
            self.state = ReceiverState::Error;
        }
        result
    }

    async fn receive(&mut self) -> Result<Option<FileEntry>, ProtocolError> {
        self.state = ReceiverState::AwaitTimestampOrControl;
        let Some(mut line) = self.read_line().await? else {
            self.state = ReceiverState::Done;
            return Ok(None);
        };

        let mut times = None;
        if line.first() == Some(&b'T') {
            times = Some(parse_timestamp(&line)?);
            self.ack().await?;
            self.state = ReceiverState::AwaitControl;
            line = self.read_line().await?.ok_or(ProtocolError::UnexpectedEof)?;
        }

        let control = parse_control(&line)?;
        if control.size > self.max_file_size {
            return Err(ProtocolError::FileTooLarge {
                name: control.name,
                size: control.size,
                max: self.max_file_size,
            });
        }
        tracing::debug!(
            name = %control.name,
            size = control.size,
            mode = %format!("{:04o}", control.mode),
            "receiving file"
        );
        self.ack().await?;

        self.state = ReceiverState::ReadPayload;
        let len = usize::try_from(control.size).map_err(|_| ProtocolError::FileTooLarge {
            name: control.name.clone(),
            size: control.size,
            max: self.max_file_size,
        })?;
        let mut content = vec![0u8; len];
        self.read_exact(&mut content).await?;

        self.state = ReceiverState::AwaitAck;
        let mut marker = [0u8; 1];
        self.read_exact(&mut marker).await?;
        if marker[0] != 0 {
            return Err(ProtocolError::MissingTerminator(marker[0]));
        }
        self.ack().await?;

        self.state = ReceiverState::Done;
        Ok(Some(FileEntry {
            filepath: join_target(&self.target, &control.name),
            name: control.name,
            mode: control.mode,
            size: control.size,
            content,
            mtime: times.map(|(mtime, _)| mtime),
            atime: times.map(|(_, atime)| atime),
        }))
    }

    /// Read one header line without its newline; `None` on clean EOF.
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>, ProtocolError> {
        let mut line = Vec::new();
        let remaining = self.deadline.remaining();
        let mut limited = (&mut self.reader).take(MAX_LINE_LEN as u64);
        let read = limited.read_until(b'\n', &mut line);
        let n = match tokio::time::timeout(remaining, read).await {
            Ok(result) => result?,
            Err(_) => return Err(ProtocolError::DeadlineExceeded),
        };

        if n == 0 {
            return Ok(None);
        }
        if line.last() != Some(&b'\n') {
            return Err(if line.len() >= MAX_LINE_LEN {
                ProtocolError::LineTooLong(MAX_LINE_LEN)
            } else {
                ProtocolError::UnexpectedEof
            });
        }
        line.pop();
        Ok(Some(line))
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ProtocolError> {
        let remaining = self.deadline.remaining();
        match tokio::time::timeout(remaining, self.reader.read_exact(buf)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(ProtocolError::UnexpectedEof)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(ProtocolError::DeadlineExceeded),
        }
    }

    async fn ack(&mut self) -> Result<(), ProtocolError> {
        let remaining = self.deadline.remaining();
        let writer = &mut self.writer;
        let write = async move {
            writer.write_all(ACK).await?;
            writer.flush().await
        };
        match tokio::time::timeout(remaining, write).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProtocolError::DeadlineExceeded),
        }
    }
}

fn parse_timestamp(line: &[u8]) -> Result<(i64, i64), ProtocolError> {
    let text = String::from_utf8_lossy(line);
    let malformed = || ProtocolError::MalformedTimestamp(text.to_string());
    let captures = TIMESTAMP_RE.captures(&text).ok_or_else(malformed)?;
    let mtime = captures[1].parse().map_err(|_| malformed())?;
    let atime = captures[2].parse().map_err(|_| malformed())?;
    Ok((mtime, atime))
}

fn parse_control(line: &[u8]) -> Result<Control, ProtocolError> {
    match line.first() {
        Some(b'C') => {}
        // 0x01 warning / 0x02 fatal: the client is reporting its own failure
        Some(1 | 2) => {
            return Err(ProtocolError::Client(
                String::from_utf8_lossy(&line[1..]).into_owned(),
            ))
        }
        Some(&byte) => return Err(ProtocolError::UnexpectedByte(byte)),
        None => return Err(ProtocolError::MalformedControl(String::new())),
    }

    let text = std::str::from_utf8(line)
        .map_err(|_| ProtocolError::MalformedControl(String::from_utf8_lossy(line).into_owned()))?;
    let malformed = || ProtocolError::MalformedControl(text.to_string());
    let captures = CONTROL_RE.captures(text).ok_or_else(malformed)?;

    let mode = u32::from_str_radix(&captures[1], 8).map_err(|_| malformed())?;
    let size = captures[2].parse::<u64>().map_err(|_| malformed())?;
    let name = captures[3].to_string();
    if name.contains('/') || name == "." || name == ".." {
        return Err(ProtocolError::InvalidName(name));
    }

    Ok(Control { mode, size, name })
}

fn join_target(target: &str, name: &str) -> String {
    if target.is_empty() || target == "." {
        name.to_string()
    } else {
        format!("{}/{name}", target.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    const MAX: u64 = 1024;

    fn receiver(input: &[u8]) -> TransferReceiver<&[u8], Vec<u8>> {
        TransferReceiver::new(
            input,
            Vec::new(),
            "/blog",
            MAX,
            Deadline::after(Duration::from_secs(10)),
        )
    }

    #[tokio::test]
    async fn receives_single_file() {
        let mut rx = receiver(b"C0644 5 test.txt\nhello\x00");

        let entry = rx.next_file().await.unwrap().unwrap();
        assert_eq!(
            entry,
            FileEntry {
                name: "test.txt".to_string(),
                filepath: "/blog/test.txt".to_string(),
                mode: 0o644,
                size: 5,
                content: b"hello".to_vec(),
                mtime: None,
                atime: None,
            }
        );
        assert_eq!(rx.state(), ReceiverState::Done);
        // one ack for the control line, one for the file
        assert_eq!(rx.writer, vec![0, 0]);
    }

    #[tokio::test]
    async fn clean_eof_between_files_ends_batch() {
        let mut rx = receiver(b"C0644 1 a.txt\na\x00C0600 2 b.txt\nbb\x00");

        let a = rx.next_file().await.unwrap().unwrap();
        let b = rx.next_file().await.unwrap().unwrap();
        assert_eq!(a.content, b"a");
        assert_eq!(b.name, "b.txt");
        assert_eq!(b.mode, 0o600);
        assert!(rx.next_file().await.unwrap().is_none());
        assert_eq!(rx.state(), ReceiverState::Done);
    }

    #[tokio::test]
    async fn timestamp_line_is_optional_and_acknowledged() {
        let mut rx = receiver(b"T1660000000 0 1660000001 0\nC0644 2 t.txt\nhi\x00");
        rx.ready().await.unwrap();

        let entry = rx.next_file().await.unwrap().unwrap();
        assert_eq!(entry.mtime, Some(1_660_000_000));
        assert_eq!(entry.atime, Some(1_660_000_001));
        assert_eq!(rx.writer, vec![0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn payload_is_raw_bytes_not_lines() {
        let mut rx = receiver(b"C0644 6 raw.txt\na\r\nb\n\n\x00");

        let entry = rx.next_file().await.unwrap().unwrap();
        assert_eq!(entry.content, b"a\r\nb\n\n");
    }

    #[tokio::test]
    async fn empty_file_is_received() {
        let mut rx = receiver(b"C0644 0 empty.txt\n\x00");

        let entry = rx.next_file().await.unwrap().unwrap();
        assert!(entry.content.is_empty());
    }

    #[tokio::test]
    async fn unknown_leading_byte_is_protocol_error() {
        let mut rx = receiver(b"D0755 0 blog\n");

        let err = rx.next_file().await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedByte(b'D')));
        assert_eq!(rx.state(), ReceiverState::Error);
        assert!(matches!(
            rx.next_file().await.unwrap_err(),
            ProtocolError::Aborted
        ));
    }

    #[tokio::test]
    async fn client_error_line_is_reported() {
        let mut rx = receiver(b"\x02scp: post.txt: No such file\n");

        let err = rx.next_file().await.unwrap_err();
        assert!(matches!(err, ProtocolError::Client(ref msg) if msg == "scp: post.txt: No such file"));
    }

    #[tokio::test]
    async fn malformed_control_lines_are_rejected() {
        for input in [
            &b"C644 5 test.txt\nhello\x00"[..],
            b"C0644 five test.txt\nhello\x00",
            b"C0644 5\nhello\x00",
            b"C0944 5 test.txt\nhello\x00",
        ] {
            let err = receiver(input).next_file().await.unwrap_err();
            assert!(matches!(err, ProtocolError::MalformedControl(_)), "{err}");
        }
    }

    #[tokio::test]
    async fn path_names_are_rejected() {
        let err = receiver(b"C0644 1 ../x.txt\nx\x00")
            .next_file()
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidName(_)));
    }

    #[tokio::test]
    async fn short_payload_is_unexpected_eof() {
        let mut rx = receiver(b"C0644 10 test.txt\nhello");

        let err = rx.next_file().await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedEof));
        assert_eq!(rx.state(), ReceiverState::Error);
    }

    #[tokio::test]
    async fn missing_terminator_is_rejected() {
        let err = receiver(b"C0644 5 test.txt\nhello!")
            .next_file()
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::MissingTerminator(b'!')));
    }

    #[tokio::test]
    async fn truncated_header_is_unexpected_eof() {
        let err = receiver(b"C0644 5 test.t").next_file().await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedEof));

        let err = receiver(b"T1 0 1 0\n").next_file().await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedEof));
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_before_payload() {
        let mut rx = receiver(b"C0644 4096 big.txt\n");

        let err = rx.next_file().await.unwrap_err();
        assert!(matches!(err, ProtocolError::FileTooLarge { size: 4096, max: MAX, .. }));
        // no ack was sent for the refused header
        assert!(rx.writer.is_empty());
    }

    #[tokio::test]
    async fn overlong_header_is_rejected() {
        let mut input = b"C0644 1 ".to_vec();
        input.extend(std::iter::repeat(b'a').take(MAX_LINE_LEN));
        input.extend_from_slice(b".txt\nx\x00");

        let err = receiver(&input).next_file().await.unwrap_err();
        assert!(matches!(err, ProtocolError::LineTooLong(MAX_LINE_LEN)));
    }

    #[tokio::test]
    async fn header_split_across_writes_is_reassembled() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut rx = TransferReceiver::new(
            tokio::io::BufReader::new(server),
            Vec::new(),
            ".",
            MAX,
            Deadline::after(Duration::from_secs(5)),
        );

        let sender = tokio::spawn(async move {
            client.write_all(b"C0644 2 sp").await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            client.write_all(b"lit.txt\nhi\x00").await.unwrap();
        });

        let entry = rx.next_file().await.unwrap().unwrap();
        assert_eq!(entry.name, "split.txt");
        assert_eq!(entry.content, b"hi");
        sender.await.unwrap();
    }

    #[tokio::test]
    async fn stalled_client_hits_deadline() {
        let (client, server) = tokio::io::duplex(64);
        let mut rx = TransferReceiver::new(
            tokio::io::BufReader::new(server),
            Vec::new(),
            ".",
            MAX,
            Deadline::after(Duration::from_millis(20)),
        );

        let err = rx.next_file().await.unwrap_err();
        assert!(matches!(err, ProtocolError::DeadlineExceeded));
        drop(client);
    }

    #[test]
    fn target_join() {
        assert_eq!(join_target(".", "a.txt"), "a.txt");
        assert_eq!(join_target("", "a.txt"), "a.txt");
        assert_eq!(join_target("/blog/", "a.txt"), "/blog/a.txt");
    }
}
