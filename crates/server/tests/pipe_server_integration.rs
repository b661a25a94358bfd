//! Integration test: platform clients <-> PipeServer
//!
//! Drives the server through its public control surface with real framed
//! clients, over the in-memory transport and (on Unix) a domain socket.

use rust_decimal_macros::dec;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tradebridge_core::{ConnectionStatus, MessageType, SessionId, TradingMessage, TradingPlatform};
use tradebridge_server::{
    EventSubscriber, MemoryConnector, PipeClient, PipeServer, ServerConfig, ServerEvent,
    memory_transport,
};

const FRAME_LIMIT: usize = 64 * 1024;

fn memory_server() -> (PipeServer, MemoryConnector) {
    let _ = env_logger::try_init();
    let (transport, connector) = memory_transport(FRAME_LIMIT);
    let mut config = ServerConfig::with_pipe_name("IntegrationBridge");
    config.accept_retry_delay_ms = 5;
    (PipeServer::new(config, Arc::new(transport)), connector)
}

fn attach(connector: &MemoryConnector) -> PipeClient {
    PipeClient::from_stream(connector.connect().expect("connect"), FRAME_LIMIT)
}

async fn next_event(events: &mut EventSubscriber) -> ServerEvent {
    timeout(Duration::from_secs(2), events.next())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

async fn expect_connected(events: &mut EventSubscriber) -> ConnectionStatus {
    match next_event(events).await {
        ServerEvent::ClientConnected(status) => status,
        other => panic!("expected ClientConnected, got {:?}", other),
    }
}

async fn expect_message(events: &mut EventSubscriber) -> TradingMessage {
    match next_event(events).await {
        ServerEvent::MessageReceived(message) => message,
        other => panic!("expected MessageReceived, got {:?}", other),
    }
}

/// Attach, handshake and wait until the server has identified the client
async fn identified_client(
    connector: &MemoryConnector,
    events: &mut EventSubscriber,
    platform: TradingPlatform,
    name: &str,
) -> (PipeClient, SessionId) {
    let mut client = attach(connector);
    client
        .send(&TradingMessage::handshake(platform, name))
        .await
        .expect("handshake");
    let status = expect_connected(events).await;
    assert_eq!(status.client_name, name);
    expect_message(events).await;
    (client, status.session_id)
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_handshake_identifies_client() {
    let (server, connector) = memory_server();
    let mut events = server.subscribe();
    server.start().await;

    let mut client = attach(&connector);
    let handshake = TradingMessage::handshake(TradingPlatform::MetaTrader4, "MT4-01");
    client.send(&handshake).await.unwrap();

    // Connected first, then the handshake frame itself
    let status = expect_connected(&mut events).await;
    assert_eq!(status.platform, TradingPlatform::MetaTrader4);
    assert_eq!(status.client_name, "MT4-01");
    assert!(status.is_connected);
    assert_eq!(expect_message(&mut events).await, handshake);

    let clients = server.connected_clients();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].session_id, status.session_id);
    assert_eq!(clients[0].platform, TradingPlatform::MetaTrader4);
    assert_eq!(clients[0].client_name, "MT4-01");

    server.stop().await;
}

#[tokio::test]
async fn test_anonymous_client_keeps_defaults_until_handshake() {
    let (server, connector) = memory_server();
    let mut events = server.subscribe();
    server.start().await;

    let mut client = attach(&connector);
    let tick = TradingMessage::new(
        TradingPlatform::NinjaTrader,
        TradingPlatform::TradingBridge,
        MessageType::MarketData,
    )
    .with_symbol("ES")
    .with_price(dec!(5321.25))
    .with_volume(dec!(3));
    client.send(&tick).await.unwrap();

    assert_eq!(expect_message(&mut events).await, tick);
    let clients = server.connected_clients();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].platform, TradingPlatform::Unknown);
    assert_eq!(clients[0].client_name, clients[0].session_id.to_string());

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_frame_does_not_end_session() {
    let (server, connector) = memory_server();
    let mut events = server.subscribe();
    server.start().await;

    let (mut client, id) =
        identified_client(&connector, &mut events, TradingPlatform::MetaTrader5, "MT5-A").await;
    let before = server.connected_clients()[0].last_activity;

    client.send_raw(&b"{\"messageType\": \"oops\""[..]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(events.try_next().is_none());
    let status = server.connected_clients()[0].clone();
    assert_eq!(status.session_id, id);
    assert!(status.is_connected);
    assert_eq!(status.last_activity, before);

    let heartbeat =
        TradingMessage::heartbeat(TradingPlatform::MetaTrader5, TradingPlatform::TradingBridge);
    client.send(&heartbeat).await.unwrap();
    assert_eq!(expect_message(&mut events).await, heartbeat);

    server.stop().await;
}

#[tokio::test]
async fn test_broadcast_and_unicast() {
    let (server, connector) = memory_server();
    let mut events = server.subscribe();
    server.start().await;

    let (mut mt4, mt4_id) =
        identified_client(&connector, &mut events, TradingPlatform::MetaTrader4, "MT4").await;
    let (mut mt5, _) =
        identified_client(&connector, &mut events, TradingPlatform::MetaTrader5, "MT5").await;

    let quote = TradingMessage::new(
        TradingPlatform::TradingBridge,
        TradingPlatform::Unknown,
        MessageType::MarketData,
    )
    .with_symbol("EURUSD")
    .with_price(dec!(1.08450));

    let report = server.send_message(&quote).await;
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(mt4.recv().await.unwrap().unwrap(), quote);
    assert_eq!(mt5.recv().await.unwrap().unwrap(), quote);

    let confirmation = TradingMessage::new(
        TradingPlatform::TradingBridge,
        TradingPlatform::MetaTrader4,
        MessageType::OrderConfirmation,
    )
    .with_payload("ticket=1042");
    assert!(server.send_message_to_client(&confirmation, &mt4_id).await);
    assert_eq!(mt4.recv().await.unwrap().unwrap(), confirmation);

    // MT5 got nothing further
    assert!(timeout(Duration::from_millis(20), mt5.recv()).await.is_err());
    assert!(events.try_next().is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_unicast_to_unknown_client() {
    let (server, connector) = memory_server();
    let mut events = server.subscribe();
    server.start().await;
    let (mut client, _) =
        identified_client(&connector, &mut events, TradingPlatform::NinjaTrader, "NT8").await;

    let ghost = SessionId::new();
    let message =
        TradingMessage::heartbeat(TradingPlatform::TradingBridge, TradingPlatform::NinjaTrader);
    assert!(!server.send_message_to_client(&message, &ghost).await);

    assert_eq!(
        next_event(&mut events).await,
        ServerEvent::ErrorOccurred(format!("Client {} not found", ghost))
    );
    assert!(events.try_next().is_none());
    // The other client saw no traffic
    assert!(timeout(Duration::from_millis(20), client.recv()).await.is_err());

    server.stop().await;
}

#[tokio::test]
async fn test_client_disconnect_removes_session() {
    let (server, connector) = memory_server();
    let mut events = server.subscribe();
    server.start().await;

    let (client, id) =
        identified_client(&connector, &mut events, TradingPlatform::MetaTrader4, "leaver").await;
    client.close().await.unwrap();

    match next_event(&mut events).await {
        ServerEvent::ClientDisconnected(status) => {
            assert_eq!(status.session_id, id);
            assert_eq!(status.client_name, "leaver");
            assert!(!status.is_connected);
        }
        other => panic!("expected ClientDisconnected, got {:?}", other),
    }
    wait_until(|| server.connected_clients().is_empty()).await;

    server.stop().await;
}

#[tokio::test]
async fn test_stop_disconnects_every_session() {
    let (server, connector) = memory_server();
    let mut events = server.subscribe();
    server.start().await;

    let mut clients = Vec::new();
    for name in ["a", "b", "c", "d"] {
        clients.push(
            identified_client(&connector, &mut events, TradingPlatform::MetaTrader5, name).await,
        );
    }
    assert_eq!(server.connected_clients().len(), 4);

    server.stop().await;
    assert!(!server.is_running());
    assert!(server.connected_clients().is_empty());

    let disconnected: Vec<SessionId> = events
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            ServerEvent::ClientDisconnected(status) => Some(status.session_id),
            ServerEvent::ErrorOccurred(e) => panic!("unexpected error on stop: {}", e),
            _ => None,
        })
        .collect();
    assert_eq!(disconnected.len(), 4);
    for (_, id) in &clients {
        assert!(disconnected.contains(id));
    }

    // Every client sees the server hang up
    for (client, _) in clients.iter_mut() {
        assert!(client.recv().await.is_none());
    }
}

#[tokio::test]
async fn test_start_stop_are_reentrant() {
    let (server, connector) = memory_server();
    let mut events = server.subscribe();

    server.stop().await;
    server.start().await;
    server.start().await;
    assert!(server.is_running());

    identified_client(&connector, &mut events, TradingPlatform::MetaTrader4, "first-run").await;
    server.stop().await;
    server.stop().await;
    assert!(!server.is_running());
    assert!(matches!(
        next_event(&mut events).await,
        ServerEvent::ClientDisconnected(_)
    ));

    // A new run accepts new clients
    server.start().await;
    identified_client(&connector, &mut events, TradingPlatform::MetaTrader4, "second-run").await;
    assert_eq!(server.connected_clients().len(), 1);
    server.stop().await;
}

#[tokio::test]
async fn test_accept_failure_is_recovered() {
    let (server, connector) = memory_server();
    let mut events = server.subscribe();
    server.start().await;

    connector
        .fail_next_accept(io::Error::new(io::ErrorKind::ConnectionAborted, "pipe torn down"))
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        ServerEvent::ErrorOccurred("Connection error: pipe torn down".into())
    );
    assert!(server.is_running());

    identified_client(&connector, &mut events, TradingPlatform::MetaTrader5, "survivor").await;
    server.stop().await;
}

#[tokio::test]
async fn test_repeated_handshake_renames_client() {
    let (server, connector) = memory_server();
    let mut events = server.subscribe();
    server.start().await;

    let (mut client, id) =
        identified_client(&connector, &mut events, TradingPlatform::MetaTrader4, "old").await;
    client
        .send(&TradingMessage::handshake(TradingPlatform::MetaTrader5, "new"))
        .await
        .unwrap();

    let status = expect_connected(&mut events).await;
    assert_eq!(status.session_id, id);
    assert_eq!(status.platform, TradingPlatform::MetaTrader5);
    assert_eq!(status.client_name, "new");
    expect_message(&mut events).await;

    server.stop().await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_unix_socket_round_trip() {
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::with_pipe_name("SocketBridge").socket_dir(dir.path());
    let server = PipeServer::local(config.clone());
    let mut events = server.subscribe();
    server.start().await;

    let socket = dir.path().join("SocketBridge.sock");
    wait_until(|| socket.exists()).await;

    let mut client = PipeClient::connect(&config).await.unwrap();
    client
        .send(&TradingMessage::handshake(TradingPlatform::MetaTrader5, "MT5-live"))
        .await
        .unwrap();
    let status = expect_connected(&mut events).await;
    assert_eq!(status.platform, TradingPlatform::MetaTrader5);
    expect_message(&mut events).await;

    let order = TradingMessage::new(
        TradingPlatform::TradingBridge,
        TradingPlatform::MetaTrader5,
        MessageType::OrderRequest,
    )
    .with_symbol("GBPUSD")
    .with_price(dec!(1.27100))
    .with_volume(dec!(0.5));
    assert!(server.send_message_to_client(&order, &status.session_id).await);
    assert_eq!(client.recv().await.unwrap().unwrap(), order);

    server.stop().await;
    assert!(client.recv().await.is_none());
    assert!(!socket.exists());
}
