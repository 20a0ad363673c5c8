use log::info;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use warp::Filter;

use super::routes::{dashboard_route, dns_cache_route, feed_route, flows_route, list_sessions_route};
use crate::distribution::hub::LiveDistributionHub;
use crate::error_handling::types::WebError;
use crate::flow::window::FlowWindow;
use crate::name_resolution::cache::NameResolutionCache;

/// Web server for the HTTP API, the dashboard and the live feed
pub struct WebServer {
    hub: Arc<LiveDistributionHub>,
    cache: Arc<NameResolutionCache>,
    window: Arc<FlowWindow>,
}

impl WebServer {
    pub fn new(
        hub: Arc<LiveDistributionHub>,
        cache: Arc<NameResolutionCache>,
        window: Arc<FlowWindow>,
    ) -> Self {
        Self { hub, cache, window }
    }

    /// Opens the listening socket that [`WebServer::start`] will serve on.
    pub async fn bind(bind_address: &str, port: u16) -> Result<TcpListener, WebError> {
        let ip: IpAddr = bind_address
            .parse()
            .map_err(|_| WebError::BadAddress(bind_address.to_string()))?;
        TcpListener::bind(SocketAddr::new(ip, port))
            .await
            .map_err(WebError::BindFailed)
    }

    /// Serves every route on `listener`; runs until the task is aborted.
    pub async fn start(&self, listener: TcpListener) -> Result<(), WebError> {
        let addr = listener.local_addr().map_err(WebError::BindFailed)?;

        let routes = dashboard_route()
            .or(list_sessions_route(self.hub.clone()))
            .or(flows_route(self.window.clone()))
            .or(dns_cache_route(self.cache.clone()))
            .or(feed_route(self.hub.clone(), self.cache.clone()));

        info!("Web interface listening on http://{}", addr);
        warp::serve(routes).incoming(listener).run().await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::types::{FlowRecord, ResolvedFlowRecord};
    use crate::name_resolution::store::MemoryHostnameStore;
    use crate::session_management::correlator::SessionCorrelator;

    struct Harness {
        base: String,
        correlator: Arc<SessionCorrelator>,
        cache: Arc<NameResolutionCache>,
        window: Arc<FlowWindow>,
    }

    async fn start_server() -> Harness {
        let correlator = Arc::new(SessionCorrelator::new(100));
        let hub = Arc::new(LiveDistributionHub::new(correlator.clone(), 16));
        let cache = Arc::new(NameResolutionCache::with_notifier(
            Arc::new(MemoryHostnameStore::new()),
            hub.clone(),
        ));
        let window = Arc::new(FlowWindow::new(10));

        let listener = WebServer::bind("127.0.0.1", 0).await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = WebServer::new(hub, cache.clone(), window.clone());
        tokio::spawn(async move { server.start(listener).await });

        Harness {
            base,
            correlator,
            cache,
            window,
        }
    }

    fn resolved(record: FlowRecord) -> ResolvedFlowRecord {
        ResolvedFlowRecord {
            record,
            source_host: String::new(),
            dest_host: String::new(),
        }
    }

    #[tokio::test]
    async fn test_dashboard_served() {
        let harness = start_server().await;

        let response = reqwest::get(&harness.base).await.unwrap();

        assert!(response.status().is_success());
        assert!(response.text().await.unwrap().contains("/feed"));
    }

    #[tokio::test]
    async fn test_sessions_endpoint() {
        let harness = start_server().await;
        let record = FlowRecord::new(
            "10.0.0.5:4000".parse().unwrap(),
            "8.8.8.8:443".parse().unwrap(),
            100,
        );
        harness.correlator.correlate(&resolved(record));

        let sessions: serde_json::Value = reqwest::get(format!("{}/sessions", harness.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(sessions.as_array().unwrap().len(), 1);
        assert_eq!(sessions[0]["dest_port"], 443);
        assert_eq!(sessions[0]["upload_bytes"], 100);
    }

    #[tokio::test]
    async fn test_dns_cache_and_flows_endpoints() {
        let harness = start_server().await;
        harness
            .cache
            .apply_update("10.0.0.5".parse().unwrap(), "laptop");
        harness.window.push(resolved(FlowRecord::new(
            "10.0.0.5:4000".parse().unwrap(),
            "8.8.8.8:443".parse().unwrap(),
            100,
        )));

        let hosts: serde_json::Value = reqwest::get(format!("{}/dns-cache", harness.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let flows: serde_json::Value = reqwest::get(format!("{}/flows", harness.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(
            hosts,
            serde_json::json!([{"address": "10.0.0.5", "hostname": "laptop"}])
        );
        assert_eq!(flows[0]["ipv4_src_addr"], "10.0.0.5");
        assert_eq!(flows[0]["in_bytes"], 100);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let harness = start_server().await;

        let response = reqwest::get(format!("{}/nope", harness.base)).await.unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_bind_address() {
        assert!(matches!(
            WebServer::bind("localhost:80", 8080).await,
            Err(WebError::BadAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_taken_port_is_reported() {
        let taken = WebServer::bind("127.0.0.1", 0).await.unwrap();
        let port = taken.local_addr().unwrap().port();

        assert!(matches!(
            WebServer::bind("127.0.0.1", port).await,
            Err(WebError::BindFailed(_))
        ));
    }
}
