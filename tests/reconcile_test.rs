//! Reconciliation tests
//!
//! Runs the engine and the runner against in-memory WireGuard, DNS, probe
//! and service fakes.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use wireguard_dynamic_remote::common::{Error, ErrorBehavior, Result, Trace};
use wireguard_dynamic_remote::config::RunConfig;
use wireguard_dynamic_remote::net::{AddressResolver, LivenessProbe, NameResolver};
use wireguard_dynamic_remote::reconcile::{
    InterfaceState, PeerFault, PeerOutcome, Reconciler, Runner, SkipReason,
};
use wireguard_dynamic_remote::service::{ServiceControl, ServiceDirective};
use wireguard_dynamic_remote::wireguard::{CorrectionMode, Endpoint, GlobalConfig, WireGuard};

/// WireGuard host with canned documents that records endpoint updates
#[derive(Default)]
struct FakeWireGuard {
    static_configs: HashMap<String, String>,
    live_configs: HashMap<String, String>,
    updates: Mutex<Vec<(String, String, String)>>,
}

impl FakeWireGuard {
    fn with_interface(mut self, name: &str, desired: &str, live: Option<&str>) -> Self {
        self.static_configs.insert(name.to_string(), desired.to_string());
        if let Some(live) = live {
            self.live_configs.insert(name.to_string(), live.to_string());
        }
        self
    }

    fn updates(&self) -> Vec<(String, String, String)> {
        self.updates.lock().unwrap().clone()
    }
}

impl WireGuard for FakeWireGuard {
    fn read_live_interface<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        let text = self.live_configs.get(name).cloned();
        async move { Ok(text) }.boxed()
    }

    fn read_static_interface<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        let text = self.static_configs.get(name).cloned();
        async move { Ok(text) }.boxed()
    }

    fn set_peer_endpoint<'a>(
        &'a self,
        interface: &'a str,
        public_key: &'a str,
        endpoint: &'a Endpoint,
    ) -> BoxFuture<'a, Result<()>> {
        self.updates.lock().unwrap().push((
            interface.to_string(),
            public_key.to_string(),
            endpoint.to_string(),
        ));
        async { Ok(()) }.boxed()
    }
}

/// DNS with a fixed answer per hostname
#[derive(Default)]
struct FakeDns {
    answers: HashMap<String, String>,
}

impl FakeDns {
    fn answer(mut self, host: &str, addresses: &[&str]) -> Self {
        self.answers.insert(host.to_string(), addresses.join("\n"));
        self
    }
}

impl NameResolver for FakeDns {
    fn query<'a>(
        &'a self,
        host: &'a str,
        _server: Option<&'a str>,
        _timeout: Duration,
    ) -> BoxFuture<'a, Result<String>> {
        let output = self.answers.get(host).cloned().unwrap_or_default();
        async move { Ok(output) }.boxed()
    }

    fn kind(&self) -> String {
        "fake".to_string()
    }
}

/// Only the listed addresses answer
struct FakeProbe {
    alive: Vec<IpAddr>,
}

impl FakeProbe {
    fn new(alive: &[&str]) -> Self {
        Self {
            alive: alive.iter().map(|a| a.parse().unwrap()).collect(),
        }
    }
}

impl LivenessProbe for FakeProbe {
    fn probe(&self, addr: IpAddr, _timeout: Duration) -> BoxFuture<'static, bool> {
        let alive = self.alive.contains(&addr);
        async move {
            if !alive {
                futures::future::pending::<()>().await;
            }
            alive
        }
        .boxed()
    }
}

/// Records service directives, optionally failing them
#[derive(Default)]
struct FakeService {
    applied: Arc<Mutex<Vec<(String, ServiceDirective)>>>,
    fail: bool,
}

impl ServiceControl for FakeService {
    fn apply<'a>(&'a self, interface: &'a str, directive: ServiceDirective) -> BoxFuture<'a, Result<()>> {
        self.applied.lock().unwrap().push((interface.to_string(), directive));
        let fail = self.fail;
        async move {
            if fail {
                Err(Error::Other("service not ready".to_string()))
            } else {
                Ok(())
            }
        }
        .boxed()
    }
}

const DESIRED: &str = "\
[Interface]
PrivateKey = cHJpdmF0ZQ==
ListenPort = 51820

[Peer]
PublicKey = peerA
AllowedIPs = 10.0.0.2/32
Endpoint = home.dyn.example.net:51820

[Peer]
PublicKey = peerB
AllowedIPs = 10.0.0.3/32
Endpoint = office.dyn.example.net:51820

[Peer]
PublicKey = passive
AllowedIPs = 10.0.0.4/32

[Peer]
PublicKey = literal
AllowedIPs = 10.0.0.5/32
Endpoint = 203.0.113.5:51820
";

fn desired_with(on_change: &str) -> String {
    DESIRED.replacen("ListenPort = 51820", &format!("ListenPort = 51820\n# OnChange = {}", on_change), 1)
}

fn live(a: &str, b: &str) -> String {
    format!(
        "[Interface]\nListenPort = 51820\nPrivateKey = cHJpdmF0ZQ==\n\n\
         [Peer]\nPublicKey = peerA\nEndpoint = {}\nAllowedIPs = 10.0.0.2/32\n\n\
         [Peer]\nPublicKey = peerB\nEndpoint = {}\nAllowedIPs = 10.0.0.3/32\n\n\
         [Peer]\nPublicKey = passive\nEndpoint = 198.51.100.9:40000\nAllowedIPs = 10.0.0.4/32\n\n\
         [Peer]\nPublicKey = literal\nEndpoint = 203.0.113.5:51820\nAllowedIPs = 10.0.0.5/32\n\n\
         [Peer]\nPublicKey = stranger\nEndpoint = 192.0.2.99:51820\nAllowedIPs = 10.0.0.9/32\n",
        a, b
    )
}

fn reconciler(wg: Arc<FakeWireGuard>, dns: FakeDns, probe: FakeProbe) -> Reconciler {
    Reconciler::new(
        wg,
        AddressResolver::new(Box::new(dns), Duration::from_secs(1), ErrorBehavior::Fatal),
        Arc::new(probe),
        Duration::from_millis(500),
        ErrorBehavior::Fatal,
    )
}

fn outcome_of<'a>(result: &'a wireguard_dynamic_remote::ReconciliationResult, key: &str) -> &'a PeerOutcome {
    &result
        .outcomes
        .iter()
        .find(|r| r.public_key == key)
        .unwrap()
        .outcome
}

#[tokio::test]
async fn test_live_address_in_resolved_set_is_unchanged() {
    let wg = Arc::new(FakeWireGuard::default());
    let dns = FakeDns::default()
        .answer("home.dyn.example.net", &["1.1.1.1", "2.2.2.2"])
        .answer("office.dyn.example.net", &["4.4.4.4"]);
    let engine = reconciler(wg.clone(), dns, FakeProbe::new(&[]));

    let desired = GlobalConfig::parse(DESIRED).unwrap();
    let live = GlobalConfig::parse(&live("1.1.1.1:51820", "4.4.4.4:51820")).unwrap();
    let result = engine
        .reconcile_interface("wg0", &desired, Some(&live), None, &mut Trace::new())
        .await
        .unwrap();

    assert_eq!(result.state, InterfaceState::Active);
    assert_eq!(outcome_of(&result, "peerA"), &PeerOutcome::Unchanged);
    assert_eq!(outcome_of(&result, "peerB"), &PeerOutcome::Unchanged);
    assert_eq!(
        outcome_of(&result, "passive"),
        &PeerOutcome::Skipped(SkipReason::PassiveEndpoint)
    );
    assert_eq!(
        outcome_of(&result, "literal"),
        &PeerOutcome::Skipped(SkipReason::LiteralAddress)
    );
    assert_eq!(
        outcome_of(&result, "stranger"),
        &PeerOutcome::Skipped(SkipReason::NotInConfig)
    );
    assert!(!result.any_changed());
    assert!(result.is_success());
    assert_eq!(result.directive, None);
    assert!(wg.updates().is_empty());
}

#[tokio::test]
async fn test_drifted_peer_is_raced_and_updated() {
    let wg = Arc::new(FakeWireGuard::default());
    let dns = FakeDns::default()
        .answer("home.dyn.example.net", &["1.1.1.1", "2.2.2.2"])
        .answer("office.dyn.example.net", &["4.4.4.4"]);
    let engine = reconciler(wg.clone(), dns, FakeProbe::new(&["2.2.2.2"]));

    let desired = GlobalConfig::parse(DESIRED).unwrap();
    let live = GlobalConfig::parse(&live("3.3.3.3:51820", "4.4.4.4:51820")).unwrap();
    let result = engine
        .reconcile_interface("wg0", &desired, Some(&live), None, &mut Trace::new())
        .await
        .unwrap();

    assert_eq!(result.mode, CorrectionMode::Set);
    assert_eq!(
        outcome_of(&result, "peerA"),
        &PeerOutcome::Changed {
            from: Endpoint::parse("3.3.3.3:51820").unwrap(),
            to: Endpoint::parse("2.2.2.2:51820").unwrap(),
            applied: true,
        }
    );
    assert_eq!(
        wg.updates(),
        vec![("wg0".to_string(), "peerA".to_string(), "2.2.2.2:51820".to_string())]
    );
    assert_eq!(result.directive, None);
    assert!(result.is_success());
}

#[tokio::test]
async fn test_empty_resolution_errors_peer_but_siblings_continue() {
    let wg = Arc::new(FakeWireGuard::default());
    let dns = FakeDns::default().answer("office.dyn.example.net", &["5.5.5.5"]);
    let engine = reconciler(wg.clone(), dns, FakeProbe::new(&[]));

    let desired = GlobalConfig::parse(DESIRED).unwrap();
    let live = GlobalConfig::parse(&live("1.1.1.1:51820", "4.4.4.4:51820")).unwrap();
    let result = engine
        .reconcile_interface("wg0", &desired, Some(&live), None, &mut Trace::new())
        .await
        .unwrap();

    assert_eq!(
        outcome_of(&result, "peerA"),
        &PeerOutcome::Errored(PeerFault::ResolutionFailed("home.dyn.example.net".to_string()))
    );
    assert!(outcome_of(&result, "peerB").is_changed());
    assert!(result.any_errored());
    assert!(!result.is_success());
    assert_eq!(wg.updates().len(), 1);
}

#[tokio::test]
async fn test_restart_mode_aggregates_one_restart() {
    let wg = Arc::new(FakeWireGuard::default());
    let dns = FakeDns::default()
        .answer("home.dyn.example.net", &["1.1.1.1"])
        .answer("office.dyn.example.net", &["5.5.5.5"]);
    let engine = reconciler(wg.clone(), dns, FakeProbe::new(&[]));

    let desired = GlobalConfig::parse(&desired_with("restart")).unwrap();
    let live = GlobalConfig::parse(&live("3.3.3.3:51820", "4.4.4.4:51820")).unwrap();
    let result = engine
        .reconcile_interface("wg0", &desired, Some(&live), None, &mut Trace::new())
        .await
        .unwrap();

    assert_eq!(result.mode, CorrectionMode::Restart);
    assert_eq!(result.changed().count(), 2);
    assert!(result
        .changed()
        .all(|r| matches!(r.outcome, PeerOutcome::Changed { applied: false, .. })));
    assert_eq!(result.directive, Some(ServiceDirective::Restart));
    assert!(wg.updates().is_empty());
}

#[tokio::test]
async fn test_absent_or_empty_interface_is_inactive() {
    let wg = Arc::new(FakeWireGuard::default());
    let engine = reconciler(wg, FakeDns::default(), FakeProbe::new(&[]));
    let desired = GlobalConfig::parse(DESIRED).unwrap();

    let result = engine
        .reconcile_interface("wg0", &desired, None, None, &mut Trace::new())
        .await
        .unwrap();
    assert_eq!(result.state, InterfaceState::Inactive);
    assert_eq!(result.directive, Some(ServiceDirective::Start));

    let no_peers = GlobalConfig::parse("[Interface]\nListenPort = 51820\n").unwrap();
    let result = engine
        .reconcile_interface("wg0", &desired, Some(&no_peers), None, &mut Trace::new())
        .await
        .unwrap();
    assert_eq!(result.state, InterfaceState::Inactive);
    assert!(result.outcomes.is_empty());
}

fn runner(wg: FakeWireGuard, dns: FakeDns, service: FakeService, interfaces: &[&str]) -> Runner {
    let settings = RunConfig {
        interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    Runner::new(
        settings,
        Arc::new(wg),
        Box::new(dns),
        Arc::new(FakeProbe::new(&[])),
        Box::new(service),
    )
}

#[tokio::test]
async fn test_runner_missing_static_config() {
    let runner = runner(FakeWireGuard::default(), FakeDns::default(), FakeService::default(), &["wg0"]);

    let result = runner.check_interface("wg0").await;
    assert!(matches!(result, Err(Error::MissingStaticConfig(_))));
    assert!(!runner.run().await);
}

#[tokio::test]
async fn test_runner_starts_absent_interface() {
    let applied = Arc::new(Mutex::new(Vec::new()));
    let service = FakeService {
        applied: applied.clone(),
        fail: true,
    };
    let wg = FakeWireGuard::default().with_interface("wg0", DESIRED, None);
    let runner = runner(wg, FakeDns::default(), service, &["wg0"]);

    let check = runner.check_interface("wg0").await.unwrap();

    assert!(check.success);
    assert_eq!(check.result.state, InterfaceState::Inactive);
    assert_eq!(
        applied.lock().unwrap().as_slice(),
        &[("wg0".to_string(), ServiceDirective::Start)]
    );
    assert!(check.trace.to_string().contains("not active"));
}

#[tokio::test]
async fn test_runner_restarts_once_and_continues_after_failures() {
    let applied = Arc::new(Mutex::new(Vec::new()));
    let service = FakeService {
        applied: applied.clone(),
        fail: false,
    };
    let wg = FakeWireGuard::default()
        .with_interface("broken", "[Peer]\nPublicKey = x\n", Some("[Interface]\n"))
        .with_interface(
            "wg0",
            &desired_with("restart"),
            Some(&live("3.3.3.3:51820", "4.4.4.4:51820")),
        );
    let dns = FakeDns::default()
        .answer("home.dyn.example.net", &["1.1.1.1"])
        .answer("office.dyn.example.net", &["5.5.5.5"]);
    let runner = runner(wg, dns, service, &["broken", "missing", "wg0"]);

    assert!(!runner.run().await);
    assert_eq!(
        applied.lock().unwrap().as_slice(),
        &[("wg0".to_string(), ServiceDirective::Restart)]
    );

    let check = runner.check_interface("wg0").await.unwrap();
    assert!(check.success);
    assert_eq!(check.result.directive, Some(ServiceDirective::Restart));
}

#[tokio::test]
async fn test_runner_show() {
    let wg = FakeWireGuard::default().with_interface("wg0", DESIRED, None);
    let runner = runner(wg, FakeDns::default(), FakeService::default(), &[]);

    let text = runner.show("wg0").await.unwrap();
    assert!(text.contains("### wg0 (config file)"));
    assert!(text.contains("Endpoint            = home.dyn.example.net:51820"));
    assert!(text.contains("# not running"));
}
