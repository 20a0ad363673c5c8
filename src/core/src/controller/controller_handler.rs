use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::configuration::config::Config;
use crate::distribution::hub::LiveDistributionHub;
use crate::error_handling::types::*;
use crate::flow::pipeline::FlowIngestPipeline;
use crate::flow::window::FlowWindow;
use crate::name_resolution::cache::NameResolutionCache;
use crate::name_resolution::poller::Poller;
use crate::name_resolution::sources::{DhcpLeaseSource, DnsCacheSource, RouterClient};
use crate::name_resolution::store::MemoryHostnameStore;
use crate::network::flow_decoder::JsonFlowDecoder;
use crate::network::flow_listener::FlowListener;
use crate::session_management::correlator::SessionCorrelator;
use crate::web_interface::web_server::WebServer;

/// Owns every long-lived component and the tasks driving them.
pub struct Controller {
    pub config: Config,
    cache: Arc<NameResolutionCache>,
    correlator: Arc<SessionCorrelator>,
    hub: Arc<LiveDistributionHub>,
    window: Arc<FlowWindow>,
    router: Arc<RouterClient>,
    tasks: Vec<JoinHandle<()>>,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        config.validate()?;

        let correlator = Arc::new(SessionCorrelator::with_limits(
            config.window.max_sessions,
            config.window.max_connections,
        ));
        let hub = Arc::new(LiveDistributionHub::new(
            correlator.clone(),
            config.window.observer_buffer,
        ));
        let cache = Arc::new(NameResolutionCache::with_notifier(
            Arc::new(MemoryHostnameStore::new()),
            hub.clone(),
        ));
        let window = Arc::new(FlowWindow::new(config.window.max_flows));
        let router = Arc::new(RouterClient::new(&config.router)?);

        info!("Controller initialised");
        Ok(Self {
            config,
            cache,
            correlator,
            hub,
            window,
            router,
            tasks: Vec::new(),
        })
    }

    pub fn cache(&self) -> Arc<NameResolutionCache> {
        self.cache.clone()
    }

    pub fn correlator(&self) -> Arc<SessionCorrelator> {
        self.correlator.clone()
    }

    pub fn hub(&self) -> Arc<LiveDistributionHub> {
        self.hub.clone()
    }

    /// Starts every task and blocks until Ctrl-C or until the collector or
    /// the web server stops.
    ///
    /// # Errors
    ///
    /// Fails when the collector socket or the web port cannot be bound.
    pub async fn run(&mut self) -> Result<(), ControllerError> {
        let collector = &self.config.collector;
        let (flow_tx, flow_rx) = mpsc::channel(collector.channel_capacity);
        let listener = FlowListener::bind(
            &collector.bind_address,
            collector.port,
            flow_tx,
            Arc::new(JsonFlowDecoder::new()),
        )
        .await?;

        let web = if self.config.web.enabled {
            let socket =
                WebServer::bind(&self.config.web.bind_address, self.config.web.port).await?;
            let server = WebServer::new(self.hub.clone(), self.cache.clone(), self.window.clone());
            Some((server, socket))
        } else {
            info!("Web interface disabled");
            None
        };

        self.spawn_pollers();

        let pipeline = FlowIngestPipeline::new(
            self.cache.clone(),
            self.correlator.clone(),
            self.window.clone(),
            self.hub.clone(),
        );
        self.tasks.push(tokio::spawn(pipeline.run(flow_rx)));

        let mut listener_task = tokio::spawn(async move { listener.start_listening().await });

        let mut web_task = match web {
            Some((server, socket)) => tokio::spawn(async move { server.start(socket).await }),
            None => tokio::spawn(std::future::pending()),
        };

        info!("flowlens is running, press Ctrl-C to stop");

        let result = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Unable to listen for Ctrl-C: {}", e);
                }
                info!("Shutdown requested");
                Ok(())
            }
            outcome = &mut listener_task => match outcome {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ControllerError::NetworkError(e)),
                Err(e) => Err(ControllerError::InitializationFailed(format!("flow listener task: {}", e))),
            },
            outcome = &mut web_task => match outcome {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ControllerError::WebError(e)),
                Err(e) => Err(ControllerError::InitializationFailed(format!("web server task: {}", e))),
            },
        };

        listener_task.abort();
        web_task.abort();
        self.shutdown();

        if let Err(e) = &result {
            error!("Stopping after failure: {}", e);
        }
        result
    }

    fn spawn_pollers(&mut self) {
        let interval = self.config.router.poll_interval();

        let dns = DnsCacheSource::new(self.router.clone(), &self.config.router);
        self.tasks
            .push(Poller::new(dns, self.cache.clone(), interval).spawn());

        let dhcp = DhcpLeaseSource::new(self.router.clone(), &self.config.router);
        self.tasks
            .push(Poller::new(dhcp, self.cache.clone(), interval).spawn());
    }

    /// Aborts every task spawned by [`Controller::run`].
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!(
            "Shut down with {} sessions and {} known hosts",
            self.correlator.len(),
            self.cache.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::types::FlowRecord;
    use std::net::UdpSocket;
    use std::time::Duration;

    fn config(extra: &str) -> Config {
        Config::from_toml_str(&format!(
            r#"
[collector]
bind_address = "127.0.0.1"
port = 0

[web]
enabled = false

[router]
base_url = "http://127.0.0.1:9"
poll_interval_ms = 60000

[window]
max_sessions = 10
max_connections = 40
{}
"#,
            extra
        ))
        .unwrap()
    }

    #[test]
    fn test_new_builds_components() {
        let controller = Controller::new(config("")).unwrap();

        assert_eq!(controller.correlator().max_sessions(), 10);
        assert_eq!(controller.correlator().max_connections(), 40);
        assert!(controller.cache().is_empty());
        assert_eq!(controller.hub().observer_count(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_window() {
        let result = Controller::new(config("max_flows = 0"));

        assert!(matches!(
            result,
            Err(ControllerError::ConfigurationError(_))
        ));
    }

    #[tokio::test]
    async fn test_collector_bind_conflict_stops_run() {
        let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut config = config("");
        config.collector.port = taken.local_addr().unwrap().port();
        let mut controller = Controller::new(config).unwrap();

        let result = controller.run().await;

        assert!(matches!(
            result,
            Err(ControllerError::NetworkError(NetworkError::BindError(_)))
        ));
    }

    #[tokio::test]
    async fn test_web_bind_conflict_stops_run() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = config("");
        config.web.enabled = true;
        config.web.bind_address = String::from("127.0.0.1");
        config.web.port = taken.local_addr().unwrap().port();
        let mut controller = Controller::new(config).unwrap();

        let result = controller.run().await;

        assert!(matches!(
            result,
            Err(ControllerError::WebError(WebError::BindFailed(_)))
        ));
        assert!(controller.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_aborts_tasks() {
        let mut controller = Controller::new(config("")).unwrap();
        controller.spawn_pollers();
        assert_eq!(controller.tasks.len(), 2);

        controller.shutdown();

        assert!(controller.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_components_are_shared() {
        let controller = Controller::new(config("")).unwrap();
        let mut observer = controller.hub().subscribe();
        let pipeline = FlowIngestPipeline::new(
            controller.cache(),
            controller.correlator(),
            controller.window.clone(),
            controller.hub(),
        );

        pipeline.process(FlowRecord::new(
            "10.0.0.5:4000".parse().unwrap(),
            "8.8.8.8:443".parse().unwrap(),
            100,
        ));

        assert_eq!(controller.correlator().len(), 1);
        let event = tokio::time::timeout(Duration::from_secs(1), observer.recv())
            .await
            .unwrap();
        assert!(event.is_some());
    }
}
