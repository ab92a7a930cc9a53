use crate::config::SendCommand;
use crate::settings::Settings;
use gwp::{Connection, DtlsConnection, UdpConnection};
use libgwp::{Address, Packet, Sample, Samples};
use log::*;
use rand::Rng;
use std::time::Duration;

/// Sensor type of the float reading in each batch.
pub const TEMPERATURE: u32 = 1;
/// Sensor type of the integer reading in each batch.
pub const COUNTER: u32 = 99;

/// A random 32-bit sender address in the range real gateways hand out.
pub fn random_sender() -> Address {
    Address::b32(rand::rng().random_range(1000..100_000))
}

/// One batch of readings from `from`, asking for an acknowledgement.
pub fn sample_packet(id: u32, from: &Address) -> Packet {
    let samples = Samples {
        samples: vec![Sample::now(from.clone(), TEMPERATURE, 21.5f32), Sample::now(from.clone(), COUNTER, 314)],
    };
    Packet::new(samples).with_id(id).with_from(from.clone()).with_require_ack(true).stamped()
}

async fn connect(cmd: &SendCommand, settings: &Settings) -> Result<Box<dyn Connection>, anyhow::Error> {
    let transport = settings.transport.clone();
    let connection: Box<dyn Connection> = match (&cmd.udp, &cmd.dtls) {
        (Some(addr), _) => Box::new(UdpConnection::dial(addr, transport).await?),
        (None, Some(addr)) => Box::new(DtlsConnection::dial(addr, settings.dtls_config()?, transport).await?),
        (None, None) => anyhow::bail!("Give the server address with --udp or --dtls"),
    };
    Ok(connection)
}

/// Send `cmd.count` sample batches and print whatever the server sends back.
pub async fn run(cmd: SendCommand, settings: Settings) -> Result<(), anyhow::Error> {
    let connection = connect(&cmd, &settings).await?;
    let sender = random_sender();
    info!("Sending {} packets as {sender} from {}", cmd.count, connection.local_addr());

    let replies = connection.requests();
    let printer = tokio::spawn(async move {
        let mut received = 0usize;
        while let Some(reply) = replies.next().await {
            received += 1;
            let json = serde_json::to_string_pretty(&reply.packet).unwrap_or_default();
            println!("GW [{:4}] : {}\n{json}", libgwp::wire_size(&reply.packet), reply.packet);
        }
        received
    });

    let interval = Duration::from_millis(cmd.interval_ms);
    for id in 1..=cmd.count {
        let packet = sample_packet(id, &sender);
        trace!("Sending {} bytes: {}", libgwp::wire_size(&packet), hex::encode(libgwp::encode(&packet)?));
        connection.send(&packet).await?;
        debug!("Sent {packet}");
        if id < cmd.count {
            tokio::time::sleep(interval).await;
        }
    }
    // Leave room for the last acknowledgements
    tokio::time::sleep(Duration::from_secs(1)).await;
    connection.close().await?;
    let received = printer.await?;
    println!("Sent {} packets, received {received} replies", cmd.count);
    Ok(())
}
