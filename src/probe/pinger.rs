//! Default [`StatusPinger`] backed by the `craftping` crate.

use async_trait::async_trait;
use craftping::Chat;
use tokio::net::TcpStream;

use super::{ProbeError, StatusDocument, StatusPinger};

/// Pings servers over the server list ping protocol.
#[derive(Debug, Default, Clone, Copy)]
pub struct CraftPinger;

#[async_trait]
impl StatusPinger for CraftPinger {
    async fn ping(&self, host: &str, port: u16) -> Result<StatusDocument, ProbeError> {
        let mut stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| ProbeError::Other(format!("connect {host}:{port}: {e}")))?;

        // Once the connection is up, any failure in the exchange means the
        // peer did not speak the protocol we expected.
        let pong = craftping::tokio::ping(&mut stream, host, port)
            .await
            .map_err(|e| ProbeError::InvalidResponse(e.to_string()))?;

        Ok(StatusDocument {
            online_count: pong.online_players as i64,
            max_count: pong.max_players as i64,
            version_name: pong.version,
            protocol: pong.protocol as i64,
            description: flatten_description(&pong.description),
        })
    }
}

/// Flatten the server's rich-text MOTD into a plain string, depth-first.
fn flatten_description(chat: &Chat) -> String {
    let mut out = String::new();
    push_text(chat, &mut out);
    out
}

fn push_text(chat: &Chat, out: &mut String) {
    out.push_str(&chat.text);
    for part in &chat.extra {
        push_text(part, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_flattening_walks_extra_parts() {
        // The same shape servers send on the wire.
        let chat: Chat = serde_json::from_str(
            r#"{"text":"Welcome to ","extra":[{"text":"My","bold":true},{"text":" Server"}]}"#,
        )
        .unwrap();
        assert_eq!(flatten_description(&chat), "Welcome to My Server");
    }
}
