//! Retry coordination
//!
//! Drives one logical operation: resolve a destination, finalize headers,
//! wrap for transport, send, classify the outcome. Transient failures mark
//! the failed node as excluded for the rest of this operation and loop back
//! into resolution under the remaining budget; terminal failures surface
//! immediately. The exclusion set lives on the operation's stack — it is
//! never shared across operations — and cancellation (dropping the future)
//! aborts the in-flight transport call without touching directory caches.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use veil_core::{Result, RoutingMode, VeilError};
use veil_onion::{build_path, encrypt_for_transport, OnionPath, DEFAULT_PATH_LEN};

use crate::context::{RequestContext, TransportResponse};
use crate::destination::resolve;
use crate::request::PreparedRequest;

/// Extra in-place attempts at building a path before the attempt counts as
/// a transient failure. A fresh path rarely needs a different snode, so
/// these do not consume retry budget or re-resolve.
const PATH_BUILD_ATTEMPTS: usize = 3;

/// The plaintext the destination finally sees, before layering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    /// Endpoint path plus query
    pub endpoint: String,
    /// HTTP method
    pub method: String,
    /// Final headers, including any post-hoc signing output
    pub headers: BTreeMap<String, String>,
    /// Request body, base64
    pub body: String,
}

/// Send a prepared request, retrying transient failures within budget.
///
/// Each retry constructs its attempt against a newly resolved destination;
/// nodes that failed earlier in this operation are excluded from redraws.
pub async fn send_with_retries(
    ctx: &RequestContext,
    request: &PreparedRequest,
) -> Result<TransportResponse> {
    let mut excluded: HashSet<[u8; 32]> = HashSet::new();
    let mut budget = request
        .destination
        .retry_budget()
        .unwrap_or(ctx.config.default_retry_budget);
    let is_random = request.destination.is_random();

    loop {
        let target = resolve(ctx, &request.destination, &excluded, &mut budget).await?;

        let body = target
            .rebuilt_body
            .clone()
            .unwrap_or_else(|| request.body.clone());

        let mut headers: BTreeMap<String, String> =
            request.headers.iter().cloned().collect();
        if let Some(hook) = &request.post_sign {
            for (name, value) in hook(&target, ctx.clock.now_ms())? {
                headers.insert(name, value);
            }
        }

        let wire = WireRequest {
            endpoint: request.destination.path_and_query(request.endpoint),
            method: request.method.to_string(),
            headers,
            body: base64_encode(&body),
        };
        let plaintext = serde_json::to_vec(&wire)?;

        let path = match build_attempt_path(ctx, &target) {
            Ok(path) => path,
            Err(e) => {
                // Path failure is retryable without marking the node
                // failed; the next attempt may reuse the same snode.
                warn!(error = %e, "path build failed, retrying");
                if !is_random {
                    if budget == 0 {
                        return Err(VeilError::retry_budget_exhausted(format!(
                            "{} after path-build failures",
                            request.endpoint
                        )));
                    }
                    budget -= 1;
                }
                continue;
            }
        };

        let payload = encrypt_for_transport(
            ctx.crypto.as_ref(),
            ctx.config.routing_mode,
            path.as_ref(),
            &target.onion_target,
            &plaintext,
        )?;

        let outcome =
            tokio::time::timeout(request.timeout, ctx.transport.send(payload, &target)).await;

        let error = match outcome {
            Err(_) => VeilError::timeout(format!("{} round trip", request.endpoint)),
            Ok(Err(e)) => e,
            Ok(Ok(response)) if (200..300).contains(&response.status) => {
                debug!(endpoint = %request.endpoint, status = response.status, "request succeeded");
                return Ok(response);
            }
            Ok(Ok(response)) => VeilError::rejected(
                response.status,
                String::from_utf8_lossy(&response.body).into_owned(),
            ),
        };

        if !error.is_transient() {
            return Err(error);
        }

        // Exclude the failing node for the remainder of this operation.
        if let Some(node) = &target.node {
            warn!(node = %node.short_id(), error = %error, "transient failure, excluding node");
            excluded.insert(node.ed25519_pub);
        } else {
            warn!(error = %error, "transient failure");
        }
        if !is_random {
            if budget == 0 {
                return Err(VeilError::retry_budget_exhausted(format!(
                    "{} after transient failures",
                    request.endpoint
                )));
            }
            budget -= 1;
        }
    }
}

fn build_attempt_path(
    ctx: &RequestContext,
    target: &crate::destination::ResolvedTarget,
) -> Result<Option<OnionPath>> {
    if ctx.config.routing_mode != RoutingMode::Onion {
        return Ok(None);
    }
    let pool = ctx.directory.known_nodes();
    let avoid = target.onion_target.ed25519_pub();

    let mut last_error = VeilError::path_build_failed("no attempt made");
    for _ in 0..PATH_BUILD_ATTEMPTS {
        match build_path(&pool, DEFAULT_PATH_LEN, avoid) {
            Ok(path) => return Ok(Some(path)),
            Err(e) => last_error = e,
        }
    }
    Err(last_error)
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.encode(bytes)
}
