//! Merge a child's stdout and stderr into one ordered-per-stream line channel.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// Lines buffered between the reader tasks and the consumer.
pub const LINE_CHANNEL_CAPACITY: usize = 256;

/// Spawn one reader task per stream and return the receiving end.
///
/// Lines are decoded lossily and stripped of `\r`/`\n`. The channel closes once
/// both streams reach EOF (or the receiver is dropped).
pub fn merged_lines<O, E>(stdout: Option<O>, stderr: Option<E>) -> mpsc::Receiver<String>
where
    O: AsyncRead + Unpin + Send + 'static,
    E: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
    if let Some(out) = stdout {
        tokio::spawn(forward_lines(out, tx.clone()));
    }
    if let Some(err) = stderr {
        tokio::spawn(forward_lines(err, tx.clone()));
    }
    rx
}

async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']);
                if tx.send(line.to_string()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!("output stream read failed: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn merges_both_streams_and_closes() {
        let out: &[u8] = b"one\r\ntwo\n";
        let err: &[u8] = b"three\n\xffbad\n";
        let mut rx = merged_lines(Some(out), Some(err));
        let mut lines = Vec::new();
        while let Some(l) = rx.recv().await {
            lines.push(l);
        }
        lines.sort();
        assert_eq!(lines, vec!["one", "three", "two", "\u{fffd}bad"]);
    }

    #[tokio::test]
    async fn missing_streams_close_immediately() {
        let mut rx = merged_lines::<&[u8], &[u8]>(None, None);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn final_line_without_newline_is_delivered() {
        let out: &[u8] = b"[download]  12.5% of 1MiB";
        let mut rx = merged_lines::<_, &[u8]>(Some(out), None);
        assert_eq!(rx.recv().await.as_deref(), Some("[download]  12.5% of 1MiB"));
        assert!(rx.recv().await.is_none());
    }
}
