use std::sync::Arc;
use warp::{reply, Filter, Rejection, Reply};

use super::feed::serve_observer;
use crate::distribution::hub::LiveDistributionHub;
use crate::flow::window::FlowWindow;
use crate::name_resolution::cache::NameResolutionCache;

const DASHBOARD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>flowlens</title>
<style>
body { font-family: monospace; margin: 1em; }
table { border-collapse: collapse; width: 100%; }
td, th { border-bottom: 1px solid #ddd; padding: 2px 8px; text-align: left; }
td.n { text-align: right; }
</style>
</head>
<body>
<h1>flowlens</h1>
<p>JSON: <a href="/sessions">/sessions</a> <a href="/flows">/flows</a> <a href="/dns-cache">/dns-cache</a></p>
<table>
<thead><tr><th>source</th><th>destination</th><th>port</th><th>upload</th><th>download</th><th>last seen</th></tr></thead>
<tbody id="sessions"></tbody>
</table>
<script>
const rows = new Map();
const body = document.getElementById("sessions");
function label(host, addr) { return host ? host + " (" + addr + ")" : addr; }
function render(s) {
  const key = s.source_addr + "|" + s.dest_addr + "|" + s.dest_port;
  let row = rows.get(key);
  if (!row) {
    row = body.insertRow(0);
    for (let i = 0; i < 6; i++) row.insertCell();
    row.cells[3].className = "n";
    row.cells[4].className = "n";
    rows.set(key, row);
  }
  const values = [
    label(s.source_host, s.source_addr),
    label(s.dest_host, s.dest_addr),
    s.dest_port,
    s.upload_bytes,
    s.download_bytes,
    s.last_seen,
  ];
  values.forEach((value, i) => { row.cells[i].textContent = String(value); });
}
const ws = new WebSocket((location.protocol === "https:" ? "wss://" : "ws://") + location.host + "/feed");
ws.onmessage = (m) => {
  const event = JSON.parse(m.data);
  if (event.type === "sessionUpdate") render(event);
};
</script>
</body>
</html>
"#;

/// GET /
pub fn dashboard_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .map(|| reply::html(DASHBOARD))
}

/// GET /sessions
pub fn list_sessions_route(
    hub: Arc<LiveDistributionHub>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("sessions")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || reply::json(&hub.snapshot()))
}

/// GET /flows
pub fn flows_route(
    window: Arc<FlowWindow>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("flows")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || reply::json(&window.snapshot()))
}

/// GET /dns-cache
pub fn dns_cache_route(
    cache: Arc<NameResolutionCache>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("dns-cache")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || reply::json(&cache.entries()))
}

/// GET /feed (websocket upgrade)
pub fn feed_route(
    hub: Arc<LiveDistributionHub>,
    cache: Arc<NameResolutionCache>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("feed")
        .and(warp::path::end())
        .and(warp::ws())
        .map(move |ws: warp::ws::Ws| {
            let hub = hub.clone();
            let cache = cache.clone();
            ws.on_upgrade(move |socket| serve_observer(socket, hub, cache))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dashboard_never_injects_markup() {
        let response = warp::test::request()
            .method("GET")
            .path("/")
            .reply(&dashboard_route())
            .await;
        let page = String::from_utf8(response.body().to_vec()).unwrap();

        assert_eq!(response.status(), 200);
        assert!(page.contains("textContent"));
        assert!(!page.contains("innerHTML"));
    }
}
