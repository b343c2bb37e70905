use std::time::Duration;

use crate::models::ConnectivityStatus;

/// Tracks reachability of the configured remote endpoint.
///
/// Probing is explicit: the sync engine decides when to pay for a network
/// round-trip, everything else reads the cached status. A probe fails
/// closed, so a timeout, transport error or non-success response all report
/// `Offline`.
pub struct ConnectivityMonitor {
    client: reqwest::Client,
    endpoint: Option<String>,
    timeout: Duration,
    status: ConnectivityStatus,
}

impl ConnectivityMonitor {
    /// `endpoint: None` means no remote is configured; probes then always
    /// report `Offline`.
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            timeout,
            status: ConnectivityStatus::Connecting,
        }
    }

    /// Issue a reachability check against the endpoint with a bounded
    /// timeout and update the cached status.
    pub async fn probe(&mut self) -> ConnectivityStatus {
        let next = match &self.endpoint {
            Some(url) => match self.client.get(url).timeout(self.timeout).send().await {
                Ok(response) if response.status().is_success() => ConnectivityStatus::Online,
                Ok(response) => {
                    tracing::debug!("Probe got non-success response: {}", response.status());
                    ConnectivityStatus::Offline
                }
                Err(e) => {
                    tracing::debug!("Probe failed: {}", e);
                    ConnectivityStatus::Offline
                }
            },
            None => ConnectivityStatus::Offline,
        };

        if next != self.status {
            tracing::info!("Connectivity changed: {:?} -> {:?}", self.status, next);
        }
        self.status = next;
        next
    }

    /// Last known status without re-probing.
    pub fn current_status(&self) -> ConnectivityStatus {
        self.status
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_connecting_state() {
        let monitor = ConnectivityMonitor::new(None, Duration::from_secs(1));
        assert_eq!(monitor.current_status(), ConnectivityStatus::Connecting);
    }

    #[tokio::test]
    async fn probe_reports_online_on_success_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(200)
            .create_async()
            .await;

        let mut monitor = ConnectivityMonitor::new(Some(server.url()), Duration::from_secs(2));
        assert_eq!(monitor.probe().await, ConnectivityStatus::Online);
        assert_eq!(monitor.current_status(), ConnectivityStatus::Online);
    }

    #[tokio::test]
    async fn probe_fails_closed_on_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(500)
            .create_async()
            .await;

        let mut monitor = ConnectivityMonitor::new(Some(server.url()), Duration::from_secs(2));
        assert_eq!(monitor.probe().await, ConnectivityStatus::Offline);
    }

    #[tokio::test]
    async fn probe_fails_closed_when_endpoint_is_unreachable() {
        // A connection to a freshly dropped listener is refused immediately
        let url = {
            let server = mockito::Server::new_async().await;
            server.url()
        };

        let mut monitor = ConnectivityMonitor::new(Some(url), Duration::from_secs(2));
        assert_eq!(monitor.probe().await, ConnectivityStatus::Offline);
    }

    #[tokio::test]
    async fn probe_without_endpoint_reports_offline() {
        let mut monitor = ConnectivityMonitor::new(None, Duration::from_secs(1));
        assert_eq!(monitor.probe().await, ConnectivityStatus::Offline);
        assert_eq!(monitor.current_status(), ConnectivityStatus::Offline);
    }

    #[tokio::test]
    async fn status_transitions_follow_probe_results() {
        let mut server = mockito::Server::new_async().await;
        let _up = server
            .mock("GET", "/")
            .with_status(200)
            .create_async()
            .await;

        let mut monitor = ConnectivityMonitor::new(Some(server.url()), Duration::from_secs(2));
        assert_eq!(monitor.probe().await, ConnectivityStatus::Online);

        // With all mocks gone the server answers 501, which must fail closed
        server.reset_async().await;
        assert_eq!(monitor.probe().await, ConnectivityStatus::Offline);
    }
}
