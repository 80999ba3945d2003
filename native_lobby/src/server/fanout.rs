//! Broadcast fan-out of server messages to sessions.
//!
//! Messages are serialized once and queued on each recipient's writer
//! channel. Delivery is best effort: a dead recipient is logged and skipped,
//! and never affects the registry mutation that produced the message.

use std::sync::Arc;

use lobby_shared::{LobbyId, PlayerId, ServerMsg};

use super::connections::{ConnectionTable, Outbound, Session};

fn encode(msg: &ServerMsg) -> Option<Outbound> {
    match serde_json::to_string(msg) {
        Ok(txt) => Some(Arc::from(txt)),
        Err(e) => {
            tracing::error!(error = %e, kind = msg.kind(), "failed to serialize ServerMsg");
            None
        }
    }
}

fn deliver(session: &Session, frame: &Outbound, kind: &'static str) -> bool {
    if session.send(Arc::clone(frame)) {
        true
    } else {
        tracing::warn!(player_id = %session.player_id, kind, "dropping message for closed connection");
        false
    }
}

/// Send to one player. Returns whether the message was queued.
pub async fn unicast(table: &ConnectionTable, player_id: &PlayerId, msg: &ServerMsg) -> bool {
    let Some(frame) = encode(msg) else {
        return false;
    };
    match table.get(player_id).await {
        Some(session) => deliver(&session, &frame, msg.kind()),
        None => {
            tracing::debug!(%player_id, kind = msg.kind(), "unicast target not connected");
            false
        }
    }
}

/// Send to every session matching `predicate`. Returns the recipient count.
pub async fn multicast<P>(table: &ConnectionTable, predicate: P, msg: &ServerMsg) -> usize
where
    P: Fn(&Session) -> bool,
{
    let Some(frame) = encode(msg) else {
        return 0;
    };
    let kind = msg.kind();
    let mut delivered = 0;
    table
        .for_each_all(|s| {
            if predicate(s) && deliver(s, &frame, kind) {
                delivered += 1;
            }
        })
        .await;
    tracing::debug!(kind, delivered, "multicast");
    delivered
}

/// Send to every session whose current lobby is `lobby_id`.
pub async fn to_lobby(table: &ConnectionTable, lobby_id: &LobbyId, msg: &ServerMsg) -> usize {
    let Some(frame) = encode(msg) else {
        return 0;
    };
    let kind = msg.kind();
    let mut delivered = 0;
    table
        .for_each_in_lobby(lobby_id, |s| {
            if deliver(s, &frame, kind) {
                delivered += 1;
            }
        })
        .await;
    tracing::debug!(%lobby_id, kind, delivered, "lobby broadcast");
    delivered
}

pub async fn broadcast_all(table: &ConnectionTable, msg: &ServerMsg) -> usize {
    multicast(table, |_| true, msg).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn connect(
        table: &ConnectionTable,
        id: &str,
        lobby: Option<&str>,
    ) -> mpsc::UnboundedReceiver<Outbound> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut session = Session::new(PlayerId::from(id), id, "", tx);
        session.current_lobby = lobby.map(LobbyId::from);
        table.register(session).await;
        rx
    }

    fn kinds(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            let v: serde_json::Value = serde_json::from_str(&frame).unwrap();
            out.push(v["type"].as_str().unwrap().to_owned());
        }
        out
    }

    #[tokio::test]
    async fn lobby_broadcast_reaches_members_only() {
        let table = ConnectionTable::new();
        let mut a = connect(&table, "a", Some("l1")).await;
        let mut b = connect(&table, "b", Some("l1")).await;
        let mut c = connect(&table, "c", Some("l2")).await;
        let mut d = connect(&table, "d", None).await;

        let n = to_lobby(&table, &LobbyId::from("l1"), &ServerMsg::error("hi")).await;
        assert_eq!(n, 2);
        assert_eq!(kinds(&mut a), ["error"]);
        assert_eq!(kinds(&mut b), ["error"]);
        assert!(kinds(&mut c).is_empty());
        assert!(kinds(&mut d).is_empty());

        assert_eq!(broadcast_all(&table, &ServerMsg::error("all")).await, 4);
        assert_eq!(kinds(&mut d), ["error"]);
    }

    #[tokio::test]
    async fn dead_recipient_does_not_stop_delivery() {
        let table = ConnectionTable::new();
        let dead = connect(&table, "a", Some("l")).await;
        drop(dead);
        let mut live = connect(&table, "b", Some("l")).await;

        let n = to_lobby(&table, &LobbyId::from("l"), &ServerMsg::error("x")).await;
        assert_eq!(n, 1);
        assert_eq!(kinds(&mut live), ["error"]);
    }

    #[tokio::test]
    async fn unicast_targets_single_player() {
        let table = ConnectionTable::new();
        let mut a = connect(&table, "a", None).await;
        let mut b = connect(&table, "b", None).await;

        assert!(unicast(&table, &PlayerId::from("a"), &ServerMsg::error("x")).await);
        assert!(!unicast(&table, &PlayerId::from("zz"), &ServerMsg::error("x")).await);
        assert_eq!(kinds(&mut a), ["error"]);
        assert!(kinds(&mut b).is_empty());

        let n = multicast(&table, |s| s.player_id.0 == "b", &ServerMsg::error("y")).await;
        assert_eq!(n, 1);
        assert_eq!(kinds(&mut b), ["error"]);
    }
}
