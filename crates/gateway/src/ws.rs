use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        extract::{
            ConnectInfo, State,
            ws::{Message, WebSocket, WebSocketUpgrade},
        },
        response::Response,
    },
    futures::{SinkExt, StreamExt},
    tokio::sync::broadcast::error::RecvError,
    tracing::{debug, info, warn},
};

use crate::state::GatewayState;

pub async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state, addr))
}

/// Forward every broadcast frame to one client until either side goes away.
/// Inbound messages are ignored apart from close.
pub async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>, addr: SocketAddr) {
    let conn_id = state.next_conn_id();
    let mut frames = state.subscribe();
    let (mut sender, mut receiver) = socket.split();
    info!(conn_id, %addr, clients = state.client_count(), "ws: client connected");

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(text) => {
                    if let Err(e) = sender.send(Message::Text(text.into())).await {
                        debug!(conn_id, error = %e, "ws: send failed");
                        break;
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(conn_id, skipped, "ws: client lagging, frames dropped");
                },
                Err(RecvError::Closed) => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(conn_id, error = %e, "ws: read error");
                    break;
                },
                Some(Ok(_)) => {},
            },
        }
    }

    info!(conn_id, %addr, "ws: client disconnected");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use {
        pairgate_session::SessionStatus,
        serde_json::{Value, json},
        tokio::net::TcpListener,
        tokio_tungstenite::{connect_async, tungstenite},
    };

    use {
        super::*,
        crate::{server::build_gateway_app, testing},
    };

    async fn serve(state: Arc<GatewayState>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_gateway_app(state);
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });
        addr
    }

    async fn wait_for_clients(state: &GatewayState, n: usize) {
        for _ in 0..100 {
            if state.client_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no websocket client subscribed");
    }

    #[tokio::test]
    async fn clients_receive_published_status() {
        let gw = testing::gateway(false).await;
        let addr = serve(Arc::clone(&gw.state)).await;

        let (mut client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        wait_for_clients(&gw.state, 1).await;

        gw.state
            .session
            .publisher()
            .publish_status(SessionStatus::Disconnected);

        let msg = tokio::time::timeout(Duration::from_secs(1), client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let tungstenite::Message::Text(text) = msg else {
            panic!("expected a text frame, got {msg:?}");
        };
        let frame: Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(frame, json!({"event": "status", "payload": "DESCONECTADO"}));
    }

    #[tokio::test]
    async fn closing_unsubscribes() {
        let gw = testing::gateway(false).await;
        let addr = serve(Arc::clone(&gw.state)).await;

        let (mut client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        wait_for_clients(&gw.state, 1).await;
        client.close(None).await.unwrap();

        for _ in 0..100 {
            if gw.state.client_count() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("closed client still subscribed");
    }
}
