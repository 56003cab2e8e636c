//
// transport.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use crate::error::Error;
use crate::wire::Message;
use crate::Result;

/// Upper bound on a single framed payload. Inlay hint replies for a large
/// document are in the tens of kilobytes; anything near this limit indicates
/// a framing bug rather than a legitimate message.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Read one `Content-Length`-framed message from the transport.
///
/// Returns `Ok(None)` when the transport is cleanly closed at a frame
/// boundary, which is how a server shutdown appears to the reader task.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Message>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader.read_line(&mut line).await?;

        if read == 0 {
            // Clean EOF only before the first header byte of a frame
            if !saw_header {
                return Ok(None);
            }
            return Err(Error::UnexpectedEof);
        }
        saw_header = true;

        let line = line.trim_end_matches(['\r', '\n']);

        // Blank line terminates the header section
        if line.is_empty() {
            break;
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(Error::InvalidHeader(line.to_string()));
        };

        if name.eq_ignore_ascii_case("content-length") {
            let length = value
                .trim()
                .parse::<usize>()
                .map_err(|_| Error::InvalidHeader(line.to_string()))?;
            content_length = Some(length);
        }
        // Other headers (e.g. `Content-Type`) are valid but carry no
        // information we need
    }

    let Some(length) = content_length else {
        return Err(Error::MissingContentLength);
    };

    if length > MAX_MESSAGE_SIZE {
        return Err(Error::MessageTooLarge(length, MAX_MESSAGE_SIZE));
    }

    let mut payload = vec![0u8; length];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            _ => Error::Io(err),
        })?;

    serde_json::from_slice(&payload).map(Some).map_err(|err| {
        Error::InvalidMessage(String::from_utf8_lossy(&payload).into_owned(), err)
    })
}

/// Frame and write one message to the transport.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(message).map_err(Error::CannotSerialize)?;
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());

    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::io::BufReader;

    use super::*;
    use crate::wire::RequestId;

    async fn roundtrip(message: Message) -> Message {
        let mut buffer = Vec::new();
        write_message(&mut buffer, &message).await.unwrap();

        let mut reader = BufReader::new(buffer.as_slice());
        read_message(&mut reader).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_message_roundtrip() {
        let sent = Message::request(RequestId::Number(42), "initialize", None);
        let received = roundtrip(sent).await;
        assert!(matches!(received, Message::Request(req) if req.method == "initialize"));
    }

    #[tokio::test]
    async fn test_clean_eof_yields_none() {
        let mut reader = BufReader::new(&b""[..]);
        let message = read_message(&mut reader).await.unwrap();
        assert!(message.is_none());
    }

    #[tokio::test]
    async fn test_eof_inside_payload_is_an_error() {
        let bytes = b"Content-Length: 100\r\n\r\n{\"truncated\": \"yes\"}";
        let mut reader = BufReader::new(&bytes[..]);
        let err = read_message(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_missing_content_length() {
        let bytes = b"Content-Type: application/json\r\n\r\n{}";
        let mut reader = BufReader::new(&bytes[..]);
        let err = read_message(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::MissingContentLength));
    }

    #[tokio::test]
    async fn test_malformed_header() {
        let bytes = b"not a header\r\n\r\n";
        let mut reader = BufReader::new(&bytes[..]);
        let err = read_message(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let bytes = format!("Content-Length: {}\r\n\r\n", MAX_MESSAGE_SIZE + 1);
        let mut reader = BufReader::new(bytes.as_bytes());
        let err = read_message(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::MessageTooLarge(_, _)));
    }

    #[tokio::test]
    async fn test_consecutive_frames() {
        let mut buffer = Vec::new();
        let first = Message::notification("initialized", None);
        let second = Message::notification("exit", None);
        write_message(&mut buffer, &first).await.unwrap();
        write_message(&mut buffer, &second).await.unwrap();

        let mut reader = BufReader::new(buffer.as_slice());
        for expected in ["initialized", "exit"] {
            let message = read_message(&mut reader).await.unwrap().unwrap();
            assert!(matches!(message, Message::Notification(n) if n.method == expected));
        }
        assert!(read_message(&mut reader).await.unwrap().is_none());
    }
}
