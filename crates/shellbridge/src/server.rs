//! Unix-socket server relaying the three platform operations to host
//! shell connections.
//!
//! Each connection is handled independently: requests are answered in
//! order, and battery events interleave on the same stream once the client
//! subscribes. A connection owns its own [`BatteryNotifier`], so closing
//! the connection always releases the subscription.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{unix::OwnedWriteHalf, UnixListener, UnixStream};
use tokio::sync::mpsc;

use shellbridge_core::{BatteryLevel, BridgeError};
use shellbridge_platform::{AppRegistry, BatteryNotifier, BatterySource, Platform};

use crate::proto::{self, ErrorCode, Request, Response};

#[derive(Clone)]
pub struct Server {
    registry: Arc<dyn AppRegistry>,
    battery: Arc<dyn BatterySource>,
}

impl Server {
    pub fn new(platform: Platform) -> Self {
        Self {
            registry: platform.registry,
            battery: platform.battery,
        }
    }

    /// Accept connections until the listener fails
    pub async fn run(self, listener: UnixListener) -> anyhow::Result<()> {
        loop {
            let (stream, _addr) = listener.accept().await?;
            tracing::info!("client connected");

            let server = self.clone();
            tokio::spawn(async move {
                match server.handle_connection(stream).await {
                    Ok(()) => tracing::info!("client disconnected"),
                    Err(e) => tracing::warn!("connection ended with error: {}", e),
                }
            });
        }
    }

    async fn handle_connection(&self, stream: UnixStream) -> anyhow::Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let mut notifier = BatteryNotifier::new(Arc::clone(&self.battery));
        let mut battery_rx: Option<mpsc::UnboundedReceiver<BatteryLevel>> = None;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let response = match proto::parse_request(&line) {
                        Ok(request) => {
                            tracing::debug!(?request, "handling request");
                            self.dispatch(request, &mut notifier, &mut battery_rx).await
                        }
                        Err(error) => error,
                    };
                    send(&mut writer, &response).await?;
                }
                event = next_event(&mut battery_rx) => {
                    match event {
                        Some(level) => {
                            send(&mut writer, &Response::BatteryLevel { level }).await?;
                        }
                        None => {
                            // The forwarding task died underneath us; report
                            // it as a stream error and end the subscription.
                            notifier.detach();
                            battery_rx = None;
                            let err = BridgeError::Subscription("Battery stream ended".to_string());
                            send(&mut writer, &Response::from_error(&err)).await?;
                        }
                    }
                }
            }
        }

        // Dropping the notifier detaches, so a client that vanishes while
        // subscribed cannot leak the subscription.
        Ok(())
    }

    async fn dispatch(
        &self,
        request: Request,
        notifier: &mut BatteryNotifier,
        battery_rx: &mut Option<mpsc::UnboundedReceiver<BatteryLevel>>,
    ) -> Response {
        match request {
            // Registry calls walk the filesystem and spawn processes, so
            // they run on the blocking pool instead of the async worker.
            Request::GetInstalledApps => {
                let registry = Arc::clone(&self.registry);
                match tokio::task::spawn_blocking(move || registry.list_apps()).await {
                    Ok(Ok(apps)) => Response::Apps { apps },
                    Ok(Err(e)) => {
                        tracing::warn!("app enumeration failed: {}", e);
                        Response::from_error(&e)
                    }
                    Err(e) => {
                        Response::error(ErrorCode::OperationFailed, format!("Registry task failed: {}", e))
                    }
                }
            }

            Request::LaunchApp { package } => {
                let Some(package) = package.filter(|p| !p.trim().is_empty()) else {
                    return Response::from_error(&BridgeError::InvalidArgument(
                        "Invalid package name".to_string(),
                    ));
                };
                let registry = Arc::clone(&self.registry);
                let id = package.clone();
                match tokio::task::spawn_blocking(move || registry.launch(&id)).await {
                    Ok(Ok(outcome)) => Response::Launch { outcome },
                    Ok(Err(e)) => {
                        tracing::warn!(package, "launch failed: {}", e);
                        Response::from_error(&e)
                    }
                    Err(e) => {
                        Response::error(ErrorCode::OperationFailed, format!("Registry task failed: {}", e))
                    }
                }
            }

            Request::SubscribeBattery => {
                // A second subscribe replaces the first stream rather than
                // duplicating it.
                *battery_rx = Some(notifier.attach());
                Response::Subscribed
            }

            Request::UnsubscribeBattery => {
                notifier.detach();
                *battery_rx = None;
                Response::Unsubscribed
            }
        }
    }
}

async fn send(writer: &mut OwnedWriteHalf, response: &Response) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

/// Wait for the next battery event, or forever when not subscribed
async fn next_event(
    rx: &mut Option<mpsc::UnboundedReceiver<BatteryLevel>>,
) -> Option<BatteryLevel> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use shellbridge_core::{AppDescriptor, BridgeResult, LaunchOutcome};
    use shellbridge_platform::ManualBatterySource;

    /// In-memory registry with fixed contents
    struct StaticRegistry {
        apps: Vec<AppDescriptor>,
        failing: Option<String>,
    }

    impl StaticRegistry {
        fn with_apps(pairs: &[(&str, &str)]) -> Self {
            Self {
                apps: pairs
                    .iter()
                    .map(|(id, name)| AppDescriptor {
                        id: id.to_string(),
                        name: name.to_string(),
                    })
                    .collect(),
                failing: None,
            }
        }
    }

    impl AppRegistry for StaticRegistry {
        fn list_apps(&self) -> BridgeResult<Vec<AppDescriptor>> {
            Ok(self.apps.clone())
        }

        fn launch(&self, id: &str) -> BridgeResult<LaunchOutcome> {
            if !self.apps.iter().any(|a| a.id == id) {
                return Ok(LaunchOutcome::NotFound);
            }
            if self.failing.as_deref() == Some(id) {
                return Ok(LaunchOutcome::Failed {
                    reason: "security restriction".to_string(),
                });
            }
            Ok(LaunchOutcome::Launched)
        }
    }

    fn test_server<R: AppRegistry + 'static>(registry: R) -> (Server, Arc<ManualBatterySource>) {
        let battery = Arc::new(ManualBatterySource::new());
        let server = Server {
            registry: Arc::new(registry),
            battery: battery.clone(),
        };
        (server, battery)
    }

    fn dispatch_ctx(server: &Server) -> (BatteryNotifier, Option<mpsc::UnboundedReceiver<BatteryLevel>>) {
        (BatteryNotifier::new(Arc::clone(&server.battery)), None)
    }

    #[tokio::test]
    async fn launch_distinguishes_found_missing_and_failed() {
        let mut registry = StaticRegistry::with_apps(&[("com.a", "A"), ("com.b", "B")]);
        registry.failing = Some("com.b".to_string());
        let (server, _battery) = test_server(registry);
        let (mut notifier, mut rx) = dispatch_ctx(&server);

        let launch = |pkg: &str| Request::LaunchApp {
            package: Some(pkg.to_string()),
        };

        assert_eq!(
            server.dispatch(launch("com.c"), &mut notifier, &mut rx).await,
            Response::Launch {
                outcome: LaunchOutcome::NotFound
            }
        );
        assert_eq!(
            server.dispatch(launch("com.a"), &mut notifier, &mut rx).await,
            Response::Launch {
                outcome: LaunchOutcome::Launched
            }
        );
        assert_eq!(
            server.dispatch(launch("com.b"), &mut notifier, &mut rx).await,
            Response::Launch {
                outcome: LaunchOutcome::Failed {
                    reason: "security restriction".to_string()
                }
            }
        );
    }

    #[tokio::test]
    async fn missing_package_is_an_invalid_argument() {
        let (server, _battery) = test_server(StaticRegistry::with_apps(&[("com.a", "A")]));
        let (mut notifier, mut rx) = dispatch_ctx(&server);

        for package in [None, Some(String::new()), Some("   ".to_string())] {
            match server
                .dispatch(Request::LaunchApp { package }, &mut notifier, &mut rx)
                .await
            {
                Response::Error { code, .. } => assert_eq!(code, ErrorCode::InvalidArgument),
                other => panic!("expected error, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn subscribe_attaches_and_unsubscribe_detaches() {
        let (server, battery) = test_server(StaticRegistry::with_apps(&[]));
        let (mut notifier, mut rx) = dispatch_ctx(&server);

        let response = server
            .dispatch(Request::SubscribeBattery, &mut notifier, &mut rx)
            .await;
        assert_eq!(response, Response::Subscribed);
        assert!(rx.is_some());

        battery.push(BatteryLevel::Percent(42));
        assert_eq!(
            rx.as_mut().unwrap().recv().await,
            Some(BatteryLevel::Percent(42))
        );

        let response = server
            .dispatch(Request::UnsubscribeBattery, &mut notifier, &mut rx)
            .await;
        assert_eq!(response, Response::Unsubscribed);
        assert!(rx.is_none());

        // Unsubscribing again is a no-op, not an error
        let response = server
            .dispatch(Request::UnsubscribeBattery, &mut notifier, &mut rx)
            .await;
        assert_eq!(response, Response::Unsubscribed);
    }

    // End-to-end over a real socket

    async fn connect(server: Server) -> (tokio::io::Lines<BufReader<tokio::net::unix::OwnedReadHalf>>, OwnedWriteHalf) {
        static NEXT_SOCKET: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);
        let n = NEXT_SOCKET.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "shellbridge-test-{}-{}.sock",
            std::process::id(),
            n
        ));
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();
        tokio::spawn(server.run(listener));

        let stream = UnixStream::connect(&path).await.unwrap();
        let (reader, writer) = stream.into_split();
        (BufReader::new(reader).lines(), writer)
    }

    async fn send_line(writer: &mut OwnedWriteHalf, line: &str) {
        writer.write_all(line.as_bytes()).await.unwrap();
        writer.write_all(b"\n").await.unwrap();
    }

    async fn read_json(
        lines: &mut tokio::io::Lines<BufReader<tokio::net::unix::OwnedReadHalf>>,
    ) -> serde_json::Value {
        let line = lines.next_line().await.unwrap().unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn round_trip_over_socket() {
        let (server, battery) =
            test_server(StaticRegistry::with_apps(&[("com.a", "A"), ("com.b", "B")]));
        let (mut lines, mut writer) = connect(server).await;

        send_line(&mut writer, r#"{"method":"getInstalledApps"}"#).await;
        let reply = read_json(&mut lines).await;
        assert_eq!(reply["type"], "apps");
        assert_eq!(reply["apps"][0]["packageName"], "com.a");
        assert_eq!(reply["apps"][1]["appName"], "B");

        send_line(&mut writer, r#"{"method":"launchApp","package":"com.c"}"#).await;
        let reply = read_json(&mut lines).await;
        assert_eq!(reply["type"], "launch");
        assert_eq!(reply["status"], "notFound");

        // Subscribe, receive one event, unsubscribe
        send_line(&mut writer, r#"{"method":"subscribeBattery"}"#).await;
        let reply = read_json(&mut lines).await;
        assert_eq!(reply["type"], "subscribed");

        battery.push(BatteryLevel::Percent(42));
        let reply = read_json(&mut lines).await;
        assert_eq!(reply["type"], "batteryLevel");
        assert_eq!(reply["level"], 42);

        send_line(&mut writer, r#"{"method":"unsubscribeBattery"}"#).await;
        let reply = read_json(&mut lines).await;
        assert_eq!(reply["type"], "unsubscribed");

        // Events pushed after unsubscribe never reach the client: the next
        // line on the wire is the next response, not a battery event.
        battery.push(BatteryLevel::Percent(7));
        send_line(&mut writer, r#"{"method":"getInstalledApps"}"#).await;
        let reply = read_json(&mut lines).await;
        assert_eq!(reply["type"], "apps");
    }

    /// Registry whose queries block the calling thread
    struct SlowRegistry;

    impl AppRegistry for SlowRegistry {
        fn list_apps(&self) -> BridgeResult<Vec<AppDescriptor>> {
            std::thread::sleep(std::time::Duration::from_secs(1));
            Ok(Vec::new())
        }

        fn launch(&self, _id: &str) -> BridgeResult<LaunchOutcome> {
            Ok(LaunchOutcome::NotFound)
        }
    }

    #[tokio::test]
    async fn blocking_registry_calls_do_not_stall_the_runtime() {
        let (server, _battery) = test_server(SlowRegistry);
        let (mut lines, mut writer) = connect(server).await;

        // Kick off the slow enumeration, then check the runtime still makes
        // timer progress while it is in flight.
        send_line(&mut writer, r#"{"method":"getInstalledApps"}"#).await;

        let started = std::time::Instant::now();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(
            started.elapsed() < std::time::Duration::from_millis(500),
            "registry call blocked the async worker for {:?}",
            started.elapsed()
        );

        // The enumeration itself still completes
        let reply = read_json(&mut lines).await;
        assert_eq!(reply["type"], "apps");
    }

    #[tokio::test]
    async fn bad_requests_do_not_kill_the_connection() {
        let (server, _battery) = test_server(StaticRegistry::with_apps(&[("com.a", "A")]));
        let (mut lines, mut writer) = connect(server).await;

        send_line(&mut writer, "garbage").await;
        let reply = read_json(&mut lines).await;
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["code"], "badRequest");

        send_line(&mut writer, r#"{"method":"rebootDevice"}"#).await;
        let reply = read_json(&mut lines).await;
        assert_eq!(reply["code"], "unknownMethod");

        send_line(&mut writer, r#"{"method":"launchApp"}"#).await;
        let reply = read_json(&mut lines).await;
        assert_eq!(reply["code"], "invalidArgument");

        // Still serving
        send_line(&mut writer, r#"{"method":"getInstalledApps"}"#).await;
        let reply = read_json(&mut lines).await;
        assert_eq!(reply["type"], "apps");
    }
}
