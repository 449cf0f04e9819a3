//! Websocket stream of the realtime payload.
//!
//! Each connected subscriber gets the `/realtime` body pushed on a fixed
//! cadence until it disconnects or the send side fails; there is no
//! subscription protocol beyond connecting.

use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{HttpRequest, HttpResponse, get, web};
use actix_web_actors::ws;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::routes::realtime_payload;
use crate::error::ApiError;
use crate::schedule::{ScheduleIndex, ServiceTime};
use crate::snapshot::SnapshotStore;

const PUSH_INTERVAL: Duration = Duration::from_secs(10);

pub struct RealtimeSocket {
    index: Arc<ScheduleIndex>,
    store: Arc<SnapshotStore>,
}

impl RealtimeSocket {
    pub fn new(index: Arc<ScheduleIndex>, store: Arc<SnapshotStore>) -> Self {
        Self { index, store }
    }
}

impl Actor for RealtimeSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.run_interval(PUSH_INTERVAL, |act, ctx| {
            match realtime_payload(&act.index, &act.store, ServiceTime::now()) {
                Ok(payload) => match serde_json::to_string(&payload) {
                    Ok(text) => ctx.text(text),
                    Err(e) => {
                        warn!(error = %e, "Dropping websocket subscriber, payload serialization failed");
                        ctx.stop();
                    }
                },
                // No snapshot yet; push nothing this tick rather than a decoy.
                Err(ApiError::NotYetReady) => {}
                Err(e) => {
                    warn!(error = %e, "Dropping websocket subscriber");
                    ctx.stop();
                }
            }
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RealtimeSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => ctx.pong(&payload),
            Ok(ws::Message::Close(reason)) => {
                debug!("Websocket subscriber disconnected");
                ctx.close(reason);
                ctx.stop();
            }
            Err(_) => ctx.stop(),
            _ => (),
        }
    }
}

#[get("/realtime/ws")]
pub async fn realtime_ws(
    req: HttpRequest,
    stream: web::Payload,
    index: web::Data<ScheduleIndex>,
    store: web::Data<SnapshotStore>,
) -> Result<HttpResponse, actix_web::Error> {
    ws::start(
        RealtimeSocket::new(index.into_inner(), store.into_inner()),
        &req,
        stream,
    )
}
