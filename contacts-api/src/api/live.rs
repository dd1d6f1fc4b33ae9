//! Server-Sent Events stream of the full contact list
//!
//! On connect the client joins the subscriber registry and immediately
//! receives the current list as a `contacts` event; every relay broadcast
//! pushes the list again. The stream ends when the client goes away or the
//! process shuts down, and the subscriber is removed from the registry.

use crate::error::ApiResult;
use crate::live::{current_snapshot, Subscriber, SubscriberFeed, SubscriberRegistry};
use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// SSE event name carrying a contact-list snapshot
pub const SNAPSHOT_EVENT: &str = "contacts";

/// Disconnects the subscriber when its stream is dropped
struct SubscriptionGuard {
    registry: Arc<SubscriberRegistry>,
    id: Uuid,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        debug!("SSE: live stream {} closed", self.id);
        self.registry.disconnect(self.id);
    }
}

/// GET /contacts/events
pub async fn live_updates(
    State(state): State<AppState>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let snapshot = current_snapshot(&state.db).await?;

    let (subscriber, feed) = Subscriber::channel();
    let guard = SubscriptionGuard {
        registry: state.registry.clone(),
        id: subscriber.id(),
    };
    state.registry.connect(subscriber, snapshot);

    let stream = snapshot_stream(feed, guard, state.shutdown.clone());

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

fn snapshot_stream(
    mut feed: SubscriberFeed,
    guard: SubscriptionGuard,
    shutdown: CancellationToken,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let _guard = guard;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = feed.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            let payload = feed.borrow_and_update().clone();
            yield Ok(Event::default().event(SNAPSHOT_EVENT).data(&*payload));
        }
    }
}
