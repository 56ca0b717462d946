// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::sync::Arc;

use log::{debug, info};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::futures::{SinkExt, StreamExt};
use rocket::http::Header;
use rocket::serde::json::Json;
use rocket::{get, routes, Build, Request, Response, Rocket, State};
use rocket_ws as ws;
use serde::Serialize;

use crate::broadcast::EventBroadcaster;
use crate::transport::LinkState;
use crate::weight::WeightStore;

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new("Access-Control-Allow-Methods", "GET, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

/// Shared state handed to the route handlers
struct GatewayState {
    store: Arc<WeightStore>,
    broadcaster: Arc<EventBroadcaster>,
    serial_link: LinkState,
    modbus_link: LinkState,
}

/// Persistent observer channel.
///
/// The connection is server-to-observer only: each queued event is
/// forwarded as one text frame containing a single JSON object. Inbound
/// payloads are ignored beyond the connection lifecycle. On close or send
/// failure the observer is unregistered and receives no further events.
#[get("/events")]
fn events(socket: ws::WebSocket, state: &State<GatewayState>) -> ws::Channel<'static> {
    let broadcaster = state.broadcaster.clone();

    socket.channel(move |mut stream| {
        Box::pin(async move {
            let (id, mut events) = broadcaster.register().await;
            info!("Observer {} connected", id);

            loop {
                tokio::select! {
                    event = events.recv() => {
                        match event {
                            Some(payload) => {
                                if stream.send(ws::Message::Text(payload)).await.is_err() {
                                    break;
                                }
                            }
                            // Broadcaster side went away
                            None => break,
                        }
                    }
                    inbound = stream.next() => {
                        match inbound {
                            Some(Ok(ws::Message::Close(_))) | None => break,
                            Some(Ok(_)) => {
                                // Observers are message sinks, payloads are not interpreted
                            }
                            Some(Err(e)) => {
                                debug!("Observer {} channel error: {}", id, e);
                                break;
                            }
                        }
                    }
                }
            }

            broadcaster.unregister(id).await;
            info!("Observer {} disconnected", id);
            Ok(())
        })
    })
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    /// Last known weight with two fractional digits, absent until the
    /// first successful parse
    weight: Option<String>,
    /// Number of currently connected observers
    observers: usize,
    /// Serial link state: closed, connecting, open or faulted
    serial_link: String,
    /// Modbus link state, same vocabulary
    modbus_link: String,
}

/// Commissioning snapshot of the gateway state
#[get("/api/status")]
async fn status(state: &State<GatewayState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        weight: state.store.get().await.map(|r| r.display_value()),
        observers: state.broadcaster.observer_count().await,
        serial_link: state.serial_link.get().to_string(),
        modbus_link: state.modbus_link.get().to_string(),
    })
}

/// Assemble the Rocket instance serving the observer gateway
pub async fn build_rocket(
    figment: Figment,
    store: Arc<WeightStore>,
    broadcaster: Arc<EventBroadcaster>,
    serial_link: LinkState,
    modbus_link: LinkState,
) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(CORS)
        .mount("/", routes![events, status])
        .manage(GatewayState {
            store,
            broadcaster,
            serial_link,
            modbus_link,
        })
}
