//! End-to-end request pipeline tests against fake collaborators: build a
//! signed request, drive it through retry and resolution, and decode the
//! swarm response, with the transport and swarm source scripted.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use veil_client::{
    decode_store_response, send_with_retries, AuthenticationInfo, MemberResult, RequestBuilder,
    RequestContext, ResolvedTarget, Transport, TransportResponse,
};
use veil_core::{
    AccountId, Clock, IdPrefix, Namespace, NetworkConfig, Result, RoutingMode, VeilError,
};
use veil_crypto::{public_key_for_secret, DalekProvider};
use veil_onion::TransportPayload;
use veil_swarm::{SwarmDirectory, SwarmNode, SwarmSource};

struct FixedClock(u64);

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0
    }
}

struct FixedSource(Vec<SwarmNode>);

#[async_trait]
impl SwarmSource for FixedSource {
    async fn fetch_swarm(&self, _account: AccountId) -> Result<Vec<SwarmNode>> {
        Ok(self.0.clone())
    }
}

/// Scripted transport: pops one outcome per send, records the node and
/// decrypted-direct payload of each attempt.
struct ScriptedTransport {
    script: Mutex<Vec<Result<TransportResponse>>>,
    attempts: Mutex<Vec<(Option<[u8; 32]>, Vec<u8>)>>,
    network_time_ms: u64,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<TransportResponse>>, network_time_ms: u64) -> Self {
        Self {
            script: Mutex::new(script),
            attempts: Mutex::new(Vec::new()),
            network_time_ms,
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        payload: TransportPayload,
        target: &ResolvedTarget,
    ) -> Result<TransportResponse> {
        self.attempts
            .lock()
            .push((target.node.as_ref().map(|n| n.ed25519_pub), payload.data));
        let mut script = self.script.lock();
        if script.is_empty() {
            return Err(VeilError::internal("transport script exhausted"));
        }
        script.remove(0)
    }

    async fn network_time(&self, _node: &SwarmNode) -> Result<u64> {
        Ok(self.network_time_ms)
    }
}

fn node(n: u8) -> SwarmNode {
    SwarmNode {
        address: format!("10.0.0.{n}"),
        port: 443,
        ed25519_pub: [n; 32],
        x25519_pub: [n.wrapping_add(100); 32],
    }
}

fn standard_auth() -> AuthenticationInfo {
    let secret = [42u8; 32].to_vec();
    let pk = public_key_for_secret(&secret).unwrap();
    AuthenticationInfo::Standard {
        account_id: AccountId::new(IdPrefix::Standard, pk),
        ed25519_secret: secret,
    }
}

fn context(nodes: Vec<SwarmNode>, transport: Arc<ScriptedTransport>) -> RequestContext {
    RequestContext {
        directory: Arc::new(SwarmDirectory::new(
            Arc::new(FixedSource(nodes)),
            Duration::from_secs(3600),
        )),
        crypto: Arc::new(DalekProvider),
        clock: Arc::new(FixedClock(1_700_000_000_000)),
        config: NetworkConfig {
            routing_mode: RoutingMode::Direct,
            ..NetworkConfig::default()
        },
        transport,
    }
}

fn builder() -> RequestBuilder {
    RequestBuilder::new(
        Arc::new(DalekProvider),
        Arc::new(FixedClock(1_700_000_000_000)),
        4,
        Duration::from_secs(10),
    )
}

fn store_body(status: u16, json: &str) -> Result<TransportResponse> {
    Ok(TransportResponse {
        status,
        body: json.as_bytes().to_vec(),
    })
}

#[tokio::test]
async fn store_round_trip_decodes_per_member_results() {
    let transport = Arc::new(ScriptedTransport::new(
        vec![store_body(
            200,
            r#"{"hash":"parent","swarm":{
                "a":{"hash":"fresh"},
                "b":{"hash":"fresh","already":true},
                "c":{"failed":true,"code":421,"reason":"wrong swarm"}
            }}"#,
        )],
        1_700_000_000_000,
    ));
    let ctx = context(vec![node(1), node(2)], Arc::clone(&transport));

    let request = builder()
        .store(&standard_auth(), Namespace::Default, b"hello", 86_400_000)
        .unwrap();
    let response = send_with_retries(&ctx, &request).await.unwrap();
    let decoded = decode_store_response(&response.body).unwrap();

    assert_eq!(decoded.swarm.len(), 3);
    assert!(!decoded.all_failed());
    assert!(decoded.swarm["a"].success().unwrap().hash == "fresh");
    assert!(decoded.swarm["b"].success().unwrap().already);
    assert!(matches!(
        decoded.swarm["c"],
        MemberResult::Failure(ref f) if f.code == Some(421)
    ));
}

#[tokio::test]
async fn retrieve_signs_with_fetched_network_time() {
    let network_time = 1_700_000_000_777u64;
    let transport = Arc::new(ScriptedTransport::new(
        vec![store_body(200, r#"{"swarm":{}}"#)],
        network_time,
    ));
    let ctx = context(vec![node(1)], Arc::clone(&transport));

    let request = builder()
        .retrieve(&standard_auth(), Namespace::Default, None)
        .unwrap();
    send_with_retries(&ctx, &request).await.unwrap();

    // In direct mode the wire envelope is plaintext JSON; the signed body
    // inside must carry the node-supplied timestamp, not the local clock.
    let attempts = transport.attempts.lock();
    let wire: serde_json::Value = serde_json::from_slice(&attempts[0].1).unwrap();
    let body_b64 = wire["body"].as_str().unwrap();
    let body: serde_json::Value = serde_json::from_slice(
        &base64_decode(body_b64),
    )
    .unwrap();
    assert_eq!(body["timestamp"], network_time);
}

#[tokio::test]
async fn transient_failures_rotate_nodes_until_success() {
    let transport = Arc::new(ScriptedTransport::new(
        vec![
            Err(VeilError::network("connection reset")),
            store_body(503, ""),
            store_body(200, r#"{"swarm":{}}"#),
        ],
        1_700_000_000_000,
    ));
    let ctx = context(vec![node(1), node(2), node(3)], Arc::clone(&transport));

    let request = builder()
        .store(&standard_auth(), Namespace::Default, b"x", 1_000)
        .unwrap();
    let response = send_with_retries(&ctx, &request).await.unwrap();
    assert_eq!(response.status, 200);

    // Three attempts, all on distinct nodes.
    let attempts = transport.attempts.lock();
    let seen: HashSet<Option<[u8; 32]>> = attempts.iter().map(|(n, _)| *n).collect();
    assert_eq!(attempts.len(), 3);
    assert_eq!(seen.len(), 3);
}

#[tokio::test]
async fn terminal_rejection_surfaces_without_retry() {
    let transport = Arc::new(ScriptedTransport::new(
        vec![store_body(401, "signature rejected")],
        1_700_000_000_000,
    ));
    let ctx = context(vec![node(1), node(2)], Arc::clone(&transport));

    let request = builder()
        .store(&standard_auth(), Namespace::Default, b"x", 1_000)
        .unwrap();
    let err = send_with_retries(&ctx, &request).await.unwrap_err();

    match err {
        VeilError::Rejected { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("signature rejected"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(transport.attempts.lock().len(), 1);
}

#[tokio::test]
async fn budget_exhaustion_after_persistent_transient_failures() {
    let transport = Arc::new(ScriptedTransport::new(
        (0..4)
            .map(|_| Err(VeilError::network("reset")))
            .collect(),
        1_700_000_000_000,
    ));
    let ctx = context(
        (1..=10).map(node).collect(),
        Arc::clone(&transport),
    );

    // Builder default budget is 4 draws.
    let request = builder()
        .store(&standard_auth(), Namespace::Default, b"x", 1_000)
        .unwrap();
    let err = send_with_retries(&ctx, &request).await.unwrap_err();
    assert!(matches!(err, VeilError::RetryBudgetExhausted { .. }));
    assert_eq!(transport.attempts.lock().len(), 4);
}

#[tokio::test]
async fn server_wire_method_matches_signed_method() {
    let transport = Arc::new(ScriptedTransport::new(
        vec![store_body(200, "{}")],
        1_700_000_000_000,
    ));
    let ctx = context(vec![node(1)], Arc::clone(&transport));

    let auth = AuthenticationInfo::Blinded {
        server_pk: [0x11; 32],
        generation: veil_crypto::BlindingGeneration::Gen15,
        ed25519_secret: [9u8; 32].to_vec(),
    };
    let request = builder()
        .server(
            &auth,
            veil_client::Endpoint::Retrieve,
            "GET",
            "open.example.org".into(),
            443,
            [0x11; 32],
            std::collections::BTreeMap::new(),
            None,
        )
        .unwrap();
    send_with_retries(&ctx, &request).await.unwrap();

    let attempts = transport.attempts.lock();
    let wire: serde_json::Value = serde_json::from_slice(&attempts[0].1).unwrap();
    assert_eq!(wire["method"], "GET");

    // The transmitted method is the one the signature covers.
    let headers = wire["headers"].as_object().unwrap();
    let pubkey = AccountId::from_hex(headers["X-Veil-Pubkey"].as_str().unwrap()).unwrap();
    let timestamp_ms: u64 = headers["X-Veil-Timestamp"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    let signature = base64_decode(headers["X-Veil-Signature"].as_str().unwrap());
    let verification = veil_client::signer::server_request_bytes(
        timestamp_ms,
        wire["method"].as_str().unwrap(),
        wire["endpoint"].as_str().unwrap(),
        None,
    );
    assert!(veil_crypto::verify_blinded_signature(
        pubkey.public_key(),
        &verification,
        &signature
    ));
}

#[tokio::test]
async fn exhausted_swarm_is_unavailable() {
    // Budget outlasts the swarm: once every node has failed, resolution
    // has no candidates left.
    let transport = Arc::new(ScriptedTransport::new(
        vec![
            Err(VeilError::network("reset")),
            Err(VeilError::network("reset")),
        ],
        1_700_000_000_000,
    ));
    let ctx = context(vec![node(1), node(2)], Arc::clone(&transport));

    let request = builder()
        .store(&standard_auth(), Namespace::Default, b"x", 1_000)
        .unwrap();
    let err = send_with_retries(&ctx, &request).await.unwrap_err();
    assert!(matches!(err, VeilError::SwarmUnavailable { .. }));
}

fn base64_decode(value: &str) -> Vec<u8> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.decode(value).unwrap()
}
