//! Newline-delimited JSON block reader.
//!
//! One `Block` object per line. Blank lines are ignored and lines that do
//! not parse are logged and skipped; the processor sees only well-formed
//! blocks, in input order.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{broadcast, mpsc};
use zonemap_processor::ShutdownReason;
use zonemap_types::Block;

/// What the reader did before it stopped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadSummary {
    pub forwarded: u64,
    pub malformed: u64,
    /// The input reached end of file (as opposed to shutdown or a gone consumer).
    pub exhausted: bool,
}

/// Forward blocks from `input` to `blocks` until EOF, shutdown, or the
/// receiver is dropped. Dropping `blocks` on return closes the source.
///
/// Lines are read as raw bytes, so a line that is not UTF-8 is just another
/// malformed line. A shutdown sender that goes away without sending does
/// not stop the reader.
pub async fn read_blocks<R>(
    mut input: R,
    blocks: mpsc::Sender<Block>,
    mut shutdown: broadcast::Receiver<ShutdownReason>,
) -> std::io::Result<ReadSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReadSummary::default();
    let mut line_no = 0u64;
    let mut buf = Vec::new();
    let mut listening = true;

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            received = shutdown.recv(), if listening => match received {
                Err(broadcast::error::RecvError::Closed) => {
                    listening = false;
                    continue;
                }
                _ => {
                    tracing::debug!("block reader stopping on shutdown");
                    return Ok(summary);
                }
            },
            read = input.read_until(b'\n', &mut buf) => read?,
        };
        if read == 0 {
            summary.exhausted = true;
            tracing::info!(
                forwarded = summary.forwarded,
                malformed = summary.malformed,
                "block input exhausted"
            );
            return Ok(summary);
        }
        line_no += 1;

        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let block: Block = match serde_json::from_slice(&buf) {
            Ok(block) => block,
            Err(e) => {
                summary.malformed += 1;
                tracing::warn!(line = line_no, error = %e, "skipping malformed block");
                continue;
            }
        };

        if blocks.send(block).await.is_err() {
            tracing::debug!("block consumer gone, reader stopping");
            return Ok(summary);
        }
        summary.forwarded += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;
    use zonemap_types::ChainId;

    const INPUT: &str = r#"{"chain_id":"A","height":1,"time":1619879832,"txs":[]}

not a block
{"chain_id":"B","height":7,"time":1619879832,"txs":[{"hash":"h1","data":"7b7d"}]}
"#;

    #[tokio::test]
    async fn forwards_blocks_in_order_and_skips_garbage() {
        let (tx, mut rx) = mpsc::channel(8);
        let (_stop, shutdown) = broadcast::channel::<ShutdownReason>(1);

        let summary = read_blocks(BufReader::new(INPUT.as_bytes()), tx, shutdown)
            .await
            .unwrap();

        assert_eq!(
            summary,
            ReadSummary {
                forwarded: 2,
                malformed: 1,
                exhausted: true,
            }
        );
        let first = rx.recv().await.unwrap();
        assert_eq!(first.chain_id, ChainId::new("A"));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.height, 7);
        assert_eq!(second.txs[0].data, b"{}".to_vec());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn non_utf8_line_is_skipped_like_any_other_garbage() {
        let mut input = br#"{"chain_id":"A","height":1,"time":1619879832,"txs":[]}"#.to_vec();
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"chain_id":"A","height":2,"time":1619879838,"txs":[]}"#);
        input.push(b'\n');
        let (tx, mut rx) = mpsc::channel(8);
        let (_stop, shutdown) = broadcast::channel::<ShutdownReason>(1);

        let summary = read_blocks(BufReader::new(input.as_slice()), tx, shutdown)
            .await
            .unwrap();

        assert_eq!(summary.forwarded, 2);
        assert_eq!(summary.malformed, 1);
        assert!(summary.exhausted);
        assert_eq!(rx.recv().await.unwrap().height, 1);
        assert_eq!(rx.recv().await.unwrap().height, 2);
    }

    #[tokio::test]
    async fn last_line_without_newline_is_read() {
        let input = r#"{"chain_id":"A","height":1,"time":1619879832,"txs":[]}"#;
        let (tx, mut rx) = mpsc::channel(8);
        let (_stop, shutdown) = broadcast::channel::<ShutdownReason>(1);

        let summary = read_blocks(BufReader::new(input.as_bytes()), tx, shutdown)
            .await
            .unwrap();
        assert_eq!(summary.forwarded, 1);
        assert_eq!(rx.recv().await.unwrap().height, 1);
    }

    #[tokio::test]
    async fn dropped_shutdown_sender_does_not_stop_reading() {
        let (tx, mut rx) = mpsc::channel(8);
        let (stop, shutdown) = broadcast::channel::<ShutdownReason>(1);
        drop(stop);

        let summary = read_blocks(BufReader::new(INPUT.as_bytes()), tx, shutdown)
            .await
            .unwrap();
        assert!(summary.exhausted);
        assert_eq!(summary.forwarded, 2);
        assert_eq!(rx.recv().await.unwrap().chain_id, ChainId::new("A"));
    }

    #[tokio::test]
    async fn stops_when_consumer_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let (_stop, shutdown) = broadcast::channel::<ShutdownReason>(1);

        let summary = read_blocks(BufReader::new(INPUT.as_bytes()), tx, shutdown)
            .await
            .unwrap();
        assert_eq!(summary.forwarded, 0);
        assert!(!summary.exhausted);
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let (tx, _rx) = mpsc::channel(8);
        let (stop, shutdown) = broadcast::channel::<ShutdownReason>(1);
        stop.send(ShutdownReason::Interrupt).unwrap();

        let summary = read_blocks(BufReader::new(INPUT.as_bytes()), tx, shutdown)
            .await
            .unwrap();
        assert_eq!(summary, ReadSummary::default());
    }
}
