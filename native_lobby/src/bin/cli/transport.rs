use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use lobby_shared::{ClientMsg, LobbyStatePayload, ServerMsg};

use super::steps::{is_quit, parse_step};
use super::utils::MessagePrinter;

/// Connect-time introduction sent as query parameters.
#[derive(Debug, Clone)]
pub struct Intro<'a> {
    pub user_id: &'a str,
    pub username: &'a str,
    pub avatar_id: &'a str,
    pub lobby_id: Option<&'a str>,
}

fn parse_base(base: &str) -> anyhow::Result<Url> {
    let base = base.trim();
    // "localhost:8080" would otherwise parse with "localhost" as the scheme.
    let url = if base.contains("://") {
        Url::parse(base)
    } else {
        Url::parse(&format!("http://{}", base))
    };
    url.with_context(|| format!("invalid server address '{}'", base))
}

/// Build the websocket URL (path `/ws` plus introduction query) from a base
/// like "localhost:8080", "http://host:8080" or "ws://host:8080/ws".
pub fn build_ws_url(base: &str, intro: &Intro<'_>) -> anyhow::Result<Url> {
    let mut url = parse_base(base)?;

    match url.scheme() {
        "http" => url.set_scheme("ws").ok(),
        "https" => url.set_scheme("wss").ok(),
        "ws" | "wss" => Some(()),
        _ => None,
    }
    .ok_or_else(|| anyhow::anyhow!("Unsupported URL scheme: {}", url.scheme()))?;

    url.set_path("/ws");
    url.set_query(None);
    {
        let mut q = url.query_pairs_mut();
        q.append_pair("userId", intro.user_id);
        q.append_pair("username", intro.username);
        q.append_pair("avatarId", intro.avatar_id);
        if let Some(lobby) = intro.lobby_id {
            q.append_pair("lobbyId", lobby);
        }
    }
    Ok(url)
}

/// HTTP base for the read-only API.
pub fn build_http_url(base: &str, path: &str) -> anyhow::Result<Url> {
    let mut url = parse_base(base)?;
    match url.scheme() {
        "ws" => url.set_scheme("http").ok(),
        "wss" => url.set_scheme("https").ok(),
        "http" | "https" => Some(()),
        _ => None,
    }
    .ok_or_else(|| anyhow::anyhow!("Unsupported URL scheme: {}", url.scheme()))?;
    url.set_path(path);
    url.set_query(None);
    Ok(url)
}

pub async fn fetch_lobbies(base: &str) -> anyhow::Result<Vec<LobbyStatePayload>> {
    let url = build_http_url(base, "/api/lobbies")?;
    let lobbies = reqwest::get(url.as_str())
        .await
        .with_context(|| format!("requesting {}", url))?
        .error_for_status()?
        .json()
        .await
        .context("decoding lobby list")?;
    Ok(lobbies)
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsRead = futures_util::stream::SplitStream<WsStream>;
type WsFrame = Option<Result<Message, tokio_tungstenite::tungstenite::Error>>;

async fn open(base: &str, intro: &Intro<'_>) -> anyhow::Result<WsStream> {
    let ws_url = build_ws_url(base, intro)?;
    let (ws_stream, _resp) = tokio_tungstenite::connect_async(ws_url.as_str())
        .await
        .with_context(|| format!("connecting to {}", ws_url))?;
    Ok(ws_stream)
}

/// Print one incoming frame. Returns false once the connection is over.
fn print_frame(frame: WsFrame, printer: &mut MessagePrinter) -> bool {
    match frame {
        Some(Ok(Message::Text(txt))) => {
            match serde_json::from_str::<ServerMsg>(&txt) {
                Ok(sm) => printer.handle(&sm),
                Err(_) => eprintln!("Unrecognized server message: {}", txt),
            }
            true
        }
        Some(Ok(Message::Close(_))) | None => false,
        Some(Ok(_)) => true,
        Some(Err(e)) => {
            eprintln!("WebSocket error: {}", e);
            false
        }
    }
}

/// Print until `wait_ms` pass without a message, or forever with `None`.
async fn print_until_quiet(read: &mut WsRead, wait_ms: Option<u64>, printer: &mut MessagePrinter) {
    loop {
        let next = match wait_ms {
            Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), read.next()).await {
                Ok(next) => next,
                Err(_) => break, // timeout
            },
            None => read.next().await,
        };
        if !print_frame(next, printer) {
            break;
        }
    }
}

/// Connect, send `msgs` in order over the one connection and print
/// everything the server sends until `wait_ms` pass without a message. With
/// `wait_ms == None` keep printing until the server closes the socket.
///
/// Closing the connection leaves whatever lobby it was in.
pub async fn run_ws(
    base: &str,
    intro: &Intro<'_>,
    msgs: Vec<ClientMsg>,
    wait_ms: Option<u64>,
    printer: &mut MessagePrinter,
) -> anyhow::Result<()> {
    let (mut write, mut read) = open(base, intro).await?.split();

    for msg in &msgs {
        let txt = serde_json::to_string(msg)?;
        write.send(Message::Text(txt)).await?;
    }
    print_until_quiet(&mut read, wait_ms, printer).await;

    let _ = write.close().await;
    Ok(())
}

/// Interactive session: commands come from stdin one per line (see
/// [`parse_step`]) and server messages are printed as they arrive. The lobby
/// membership lasts until `quit`, end of input or the server closing.
pub async fn run_session(
    base: &str,
    intro: &Intro<'_>,
    wait_ms: u64,
    printer: &mut MessagePrinter,
) -> anyhow::Result<()> {
    let (mut write, mut read) = open(base, intro).await?.split();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                if is_quit(&line) {
                    break;
                }
                match parse_step(&line) {
                    Ok(Some(msg)) => {
                        let txt = serde_json::to_string(&msg)?;
                        write.send(Message::Text(txt)).await?;
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{}", e),
                }
            }
            frame = read.next() => {
                if !print_frame(frame, printer) {
                    return Ok(());
                }
            }
        }
    }

    // Replies to the last commands may still be in flight.
    print_until_quiet(&mut read, Some(wait_ms), printer).await;
    let _ = write.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intro(lobby: Option<&str>) -> Intro<'_> {
        Intro {
            user_id: "u1",
            username: "Ada Lovelace",
            avatar_id: "7",
            lobby_id: lobby,
        }
    }

    #[test]
    fn ws_url_from_http_base() {
        let url = build_ws_url("http://localhost:8080", &intro(None)).unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:8080/ws?userId=u1&username=Ada+Lovelace&avatarId=7"
        );
    }

    #[test]
    fn ws_url_keeps_secure_scheme_and_adds_lobby() {
        let url = build_ws_url("https://example.com/other?x=1", &intro(Some("l1"))).unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/ws");
        assert!(url.query().unwrap().ends_with("&lobbyId=l1"));
        assert!(!url.query().unwrap().contains("x=1"));
    }

    #[test]
    fn bare_host_is_accepted() {
        let url = build_ws_url("localhost:8080", &intro(None)).unwrap();
        assert_eq!(url.scheme(), "ws");
        let http = build_http_url("ws://localhost:8080/ws", "/api/lobbies").unwrap();
        assert_eq!(http.as_str(), "http://localhost:8080/api/lobbies");
    }

    #[test]
    fn unsupported_scheme() {
        assert!(build_ws_url("ftp://host", &intro(None)).is_err());
    }
}
