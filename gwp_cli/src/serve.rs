use crate::config::ServeCommand;
use crate::error::CliError;
use crate::settings::Settings;
use gwp::{handler_fn, DtlsListener, Listener, Mux, Request, Server, UdpConnection};
use libgwp::{wire_size, Data, Payload, PayloadKind};
use log::*;
use std::sync::Arc;

/// Log a request with its packet rendered as JSON.
fn log_request(request: &Request) {
    let json = serde_json::to_string_pretty(&request.packet).unwrap_or_else(|err| format!("<unprintable: {err}>"));
    let size = wire_size(&request.packet);
    let received = request.timestamp.format("%H:%M:%S%.3f");
    info!("{received} [{size:4}] {} from {}\n{json}", request.packet, request.remote_addr);
}

/// A sealed mux with a handler for every payload type. Config polls are answered from `settings`, and anything that
/// asks for an acknowledgement gets one.
pub fn build_mux(settings: Arc<Settings>) -> Result<Mux, CliError> {
    let mut mux = Mux::new();
    for kind in PayloadKind::ALL {
        let settings = settings.clone();
        mux.add_handler(
            &kind,
            handler_fn(move |request: Request| {
                let settings = settings.clone();
                async move {
                    log_request(&request);
                    match &request.packet.payload {
                        Some(Payload::PollConfig(poll)) => {
                            let answer = request.packet.response(settings.config_for(&poll.fields)).stamped();
                            request.reply(&answer).await?;
                        }
                        Some(_) if request.packet.require_ack => {
                            let ack = request.packet.response(Data::default()).stamped();
                            request.reply(&ack).await?;
                        }
                        _ => {}
                    }
                    Ok(())
                }
            }),
        )?;
    }
    mux.seal();
    let kinds: Vec<_> =
        PayloadKind::ALL.iter().filter(|kind| mux.handles(**kind)).map(|kind| kind.to_string()).collect();
    debug!("Mux handles {}", kinds.join(", "));
    Ok(mux)
}

pub async fn build_server(cmd: &ServeCommand, settings: Arc<Settings>) -> Result<Server, CliError> {
    if cmd.udp.is_empty() && cmd.dtls.is_empty() {
        return Err(CliError::NoListeners);
    }
    let mut server = Server::new();
    for addr in &cmd.udp {
        let listener = UdpConnection::listen(addr, settings.transport.clone()).await?;
        info!("Listening for UDP on {}", listener.local_addr());
        server = server.with_listener(Arc::new(listener));
    }
    for addr in &cmd.dtls {
        let listener = DtlsListener::listen(addr, settings.dtls_config()?, settings.transport.clone()).await?;
        info!("Listening for DTLS on {}", listener.local_addr());
        server = server.with_listener(Arc::new(listener));
    }
    let server = server.with_handler(build_mux(settings)?).on_shutdown(|| info!("All listeners closed"));
    Ok(server)
}

/// Run the server until Ctrl-C.
pub async fn run(cmd: ServeCommand, settings: Settings) -> Result<(), anyhow::Error> {
    let server = build_server(&cmd, Arc::new(settings)).await?;
    server.start()?;
    info!("Server running. Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    server.shutdown().await?;
    Ok(())
}
