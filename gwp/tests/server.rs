use gwp::libgwp::{Data, Packet, Payload, PayloadKind, Sample, Samples};
use gwp::{handler_fn, Listener, Mux, Peer, Request, Server, TransportConfig, UdpConnection};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn config() -> TransportConfig {
    TransportConfig::default().with_read_timeout(Duration::from_millis(100))
}

/// A mux that records the id of every `Data` payload and acknowledges `Samples`.
fn recording_mux(seen: Arc<Mutex<Vec<u32>>>) -> Mux {
    let mut mux = Mux::new();
    mux.add_handler(
        &PayloadKind::Data,
        handler_fn(move |request: Request| {
            let seen = seen.clone();
            async move {
                if let Some(Payload::Data(data)) = &request.packet.payload {
                    seen.lock().unwrap().push(data.id);
                }
                Ok(())
            }
        }),
    )
    .unwrap();
    mux.add_handler(
        &Samples::default(),
        handler_fn(|request: Request| async move {
            let ack = request.packet.response(Data::default());
            request.reply(&ack).await?;
            Ok(())
        }),
    )
    .unwrap();
    mux.seal();
    mux
}

async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn serves_requests_until_shutdown() {
    env_logger::try_init().ok();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let shut_down = Arc::new(Mutex::new(0));
    let listener = Arc::new(UdpConnection::listen("127.0.0.1:0", config()).await.unwrap());
    let callback_count = shut_down.clone();
    let server = Server::new()
        .with_listener(listener.clone())
        .with_handler(recording_mux(seen.clone()))
        .on_shutdown(move || *callback_count.lock().unwrap() += 1);
    server.start().unwrap();

    let client = UdpConnection::dial(&listener.local_addr().to_string(), config()).await.unwrap();
    for id in 1..=5 {
        client.send(&Packet::new(Data { r#type: 1, id, data: vec![id as u8] }).with_id(id)).await.unwrap();
    }
    assert!(wait_until(|| seen.lock().unwrap().len() == 5).await, "all Data requests handled");
    let mut ids = seen.lock().unwrap().clone();
    ids.sort();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    let samples = Samples { samples: vec![Sample::default(), Sample::default()] };
    client.send(&Packet::new(samples).with_id(6).with_require_ack(true)).await.unwrap();
    let ack = tokio::time::timeout(Duration::from_secs(5), client.requests().next()).await.unwrap().unwrap();
    assert_eq!(ack.packet.response_to, Some(6));

    server.shutdown().await.unwrap();
    assert_eq!(*shut_down.lock().unwrap(), 1);
    assert!(listener.requests().next().await.is_none());
    assert!(server.shutdown().await.is_err());
    assert_eq!(*shut_down.lock().unwrap(), 1);
    client.close().await.unwrap();
}

#[tokio::test]
async fn serves_several_listeners() {
    env_logger::try_init().ok();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let a = Arc::new(UdpConnection::listen("127.0.0.1:0", config()).await.unwrap());
    let b = Arc::new(UdpConnection::listen("127.0.0.1:0", config()).await.unwrap());
    let server =
        Server::new().with_listener(a.clone()).with_listener(b.clone()).with_handler(recording_mux(seen.clone()));
    assert_eq!(server.listeners().len(), 2);
    server.start().unwrap();

    let to_a = UdpConnection::dial(&a.local_addr().to_string(), config()).await.unwrap();
    let to_b = UdpConnection::dial(&b.local_addr().to_string(), config()).await.unwrap();
    to_a.send(&Packet::new(Data { id: 10, ..Default::default() })).await.unwrap();
    to_b.send(&Packet::new(Data { id: 20, ..Default::default() })).await.unwrap();
    assert!(wait_until(|| seen.lock().unwrap().len() == 2).await);

    server.shutdown().await.unwrap();
    to_a.close().await.unwrap();
    to_b.close().await.unwrap();
}
