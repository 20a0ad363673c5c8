use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use std::sync::Arc;
use warp::ws::{Message, WebSocket};

use crate::distribution::hub::LiveDistributionHub;
use crate::distribution::types::FeedEvent;
use crate::name_resolution::cache::NameResolutionCache;

/// Drives one websocket observer until it disconnects.
///
/// The observer is registered before the snapshot is taken so that no update
/// falls between the two. Sessions come first, then the hostname table, then
/// the live stream. Incoming frames are ignored apart from close.
pub async fn serve_observer(
    socket: WebSocket,
    hub: Arc<LiveDistributionHub>,
    cache: Arc<NameResolutionCache>,
) {
    let mut observer = hub.subscribe();
    let id = observer.id;

    let (mut sink, mut incoming) = socket.split();

    let initial = hub
        .snapshot()
        .into_iter()
        .map(FeedEvent::SessionUpdate)
        .chain(cache.entries().into_iter().map(FeedEvent::CacheUpdate));

    let mut connected = true;
    for event in initial {
        if !send_event(&mut sink, &event).await {
            connected = false;
            break;
        }
    }

    while connected {
        tokio::select! {
            event = observer.recv() => match event {
                Some(event) => connected = send_event(&mut sink, &event).await,
                None => connected = false,
            },
            frame = incoming.next() => match frame {
                Some(Ok(message)) if message.is_close() => connected = false,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Observer {} socket error: {}", id, e);
                    connected = false;
                }
                None => connected = false,
            },
        }
    }

    hub.unsubscribe(id);
    let _ = sink.close().await;
}

/// Returns `false` once the socket can no longer be written.
async fn send_event(sink: &mut SplitSink<WebSocket, Message>, event: &FeedEvent) -> bool {
    let text = match event.to_json() {
        Ok(text) => text,
        Err(e) => {
            warn!("Unable to encode feed event: {}", e);
            return true;
        }
    };
    sink.send(Message::text(text)).await.is_ok()
}
