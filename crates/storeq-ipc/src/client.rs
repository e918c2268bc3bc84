//! IPC client implementation

use std::path::Path;
use storeq_api::{Command, CommandInfo, Reply, Request, Response, ResponsePayload, ResponseResult};
use storeq_util::UserId;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::{IpcError, IpcResult};

/// IPC Client for connecting to storeqd
pub struct IpcClient {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    writer: tokio::net::unix::OwnedWriteHalf,
    next_request_id: u64,
}

impl IpcClient {
    /// Connect to storeqd
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            next_request_id: 1,
        })
    }

    /// Send a command and wait for response
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let request = Request::new(request_id, command);
        let mut json = serde_json::to_string(&request)?;
        json.push('\n');

        self.writer.write_all(json.as_bytes()).await?;

        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(IpcError::ConnectionClosed);
        }

        let response: Response = serde_json::from_str(line.trim())?;

        if response.request_id != request_id {
            return Err(IpcError::InvalidMessage(format!(
                "expected response to request {}, got {}",
                request_id, response.request_id
            )));
        }

        Ok(response)
    }

    /// Deliver one user message and return the replies
    pub async fn message(&mut self, user_id: &UserId, text: &str) -> IpcResult<Vec<Reply>> {
        let response = self
            .send(Command::Message {
                user_id: user_id.clone(),
                text: text.to_string(),
            })
            .await?;

        match response.result {
            ResponseResult::Ok(ResponsePayload::Replies { replies, .. }) => Ok(replies),
            ResponseResult::Ok(other) => Err(IpcError::InvalidMessage(format!(
                "unexpected payload: {:?}",
                other
            ))),
            ResponseResult::Err(e) => Err(IpcError::ServerError(e.message)),
        }
    }

    /// Command menu the daemon wants registered
    pub async fn list_commands(&mut self) -> IpcResult<Vec<CommandInfo>> {
        let response = self.send(Command::ListCommands).await?;

        match response.result {
            ResponseResult::Ok(ResponsePayload::Commands { commands }) => Ok(commands),
            ResponseResult::Ok(other) => Err(IpcError::InvalidMessage(format!(
                "unexpected payload: {:?}",
                other
            ))),
            ResponseResult::Err(e) => Err(IpcError::ServerError(e.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    // Client tests would require a running server
    // See the server tests and storeqd integration tests
}
