use log::{debug, info};
use shared::Command;
use std::net::SocketAddr;
use std::num::ParseIntError;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

/// Pause after each command so the server reads it in its own receive
const COMMAND_GAP: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server sent a malformed line {line:?}: {source}")]
    Malformed { line: String, source: ParseIntError },
}

pub struct SequenceClient {
    server_addr: SocketAddr,
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl SequenceClient {
    pub async fn connect(server_addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(server_addr).await?;
        info!("Connected to {}", server_addr);

        let (reader, writer) = stream.into_split();

        Ok(Self {
            server_addr,
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Sends `seq<slot> <start> <step>`
    pub async fn configure(&mut self, slot: u8, start: u32, step: u32) -> Result<(), ClientError> {
        self.send(Command::Configure { slot, start, step }).await
    }

    /// Sends `export seq`; the server starts streaming if anything is configured
    pub async fn export(&mut self) -> Result<(), ClientError> {
        self.send(Command::Export).await
    }

    pub async fn send(&mut self, command: Command) -> Result<(), ClientError> {
        self.send_raw(&format!("{}\r\n", command.to_line())).await
    }

    /// Writes `raw` as is, without adding a terminator
    pub async fn send_raw(&mut self, raw: &str) -> Result<(), ClientError> {
        debug!("-> {:?}", raw);
        self.writer.write_all(raw.as_bytes()).await?;
        self.writer.flush().await?;
        sleep(COMMAND_GAP).await;
        Ok(())
    }

    /// Reads the next exported line, or `None` once the server closed
    pub async fn next_line(&mut self) -> Result<Option<String>, ClientError> {
        Ok(self.lines.next_line().await?)
    }

    /// Like [`next_line`](Self::next_line) but gives up after `wait`,
    /// returning `Ok(None)` on timeout
    pub async fn next_line_timeout(&mut self, wait: Duration) -> Result<Option<String>, ClientError> {
        match timeout(wait, self.lines.next_line()).await {
            Ok(line) => Ok(line?),
            Err(_) => Ok(None),
        }
    }

    /// Reads the next exported line and parses its values
    pub async fn next_values(&mut self) -> Result<Option<Vec<u64>>, ClientError> {
        match self.next_line().await? {
            Some(line) => parse_values(&line).map(Some),
            None => Ok(None),
        }
    }

    /// Closes the write side; the server sees an orderly close
    pub async fn shutdown(mut self) -> Result<(), ClientError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Parses one exported line, `"<v1> <v2> ..."`
pub fn parse_values(line: &str) -> Result<Vec<u64>, ClientError> {
    line.split_whitespace()
        .map(|value| {
            value.parse::<u64>().map_err(|source| ClientError::Malformed {
                line: line.to_string(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_values("10 20 30").unwrap(), vec![10, 20, 30]);
        assert_eq!(parse_values("18446744073709551615").unwrap(), vec![u64::MAX]);
        assert!(parse_values("").unwrap().is_empty());
        assert!(matches!(
            parse_values("10 x"),
            Err(ClientError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_commands_on_the_wire() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = String::new();
            socket.read_to_string(&mut received).await.unwrap();
            received
        });

        let mut client = SequenceClient::connect(addr).await.unwrap();
        assert_eq!(client.server_addr(), addr);
        client.configure(2, 5, 7).await.unwrap();
        client.export().await.unwrap();
        client.shutdown().await.unwrap();

        assert_eq!(server.await.unwrap(), "seq2 5 7\r\nexport seq\r\n");
    }

    #[tokio::test]
    async fn test_next_values() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"1 2\n3 4\n").await.unwrap();
        });

        let mut client = SequenceClient::connect(addr).await.unwrap();
        assert_eq!(client.next_values().await.unwrap(), Some(vec![1, 2]));
        assert_eq!(client.next_values().await.unwrap(), Some(vec![3, 4]));
        assert_eq!(client.next_values().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_next_line_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            sleep(Duration::from_secs(1)).await;
            drop(socket);
        });

        let mut client = SequenceClient::connect(addr).await.unwrap();
        let line = client
            .next_line_timeout(Duration::from_millis(50))
            .await
            .unwrap();
        assert!(line.is_none());
    }
}
