// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock Kubernetes API, resource fixtures and in-memory fakes.

use crate::constants::{core, gateway_api};
use crate::dataplane::{ConfigApplier, DataplaneConfig};
use crate::error::{Result, WaypostError};
use crate::events::{NamespacedName, TrackedKind};
use crate::kubernetes::{EventRecorder, Getter};
use crate::status::{ResourceStatus, StatusKey, StatusSink};
use crate::types::gateway::GatewaySpec;
use crate::types::http_route::{
    HTTPBackendRef, HTTPPathMatch, HTTPRouteMatch, HTTPRouteRule, HTTPRouteSpec,
};
use crate::types::reference_grant::{ReferenceGrantFrom, ReferenceGrantSpec, ReferenceGrantTo};
use crate::types::{Gateway, HTTPRoute, Listener, ParentReference, ReferenceGrant};
use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::core::v1::{ObjectReference, Secret, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::client::Body;
use kube::Client;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service as TowerService;

/// GatewayClass used by all fixtures
pub const TEST_GATEWAY_CLASS: &str = "waypost";

/// A request seen by [`MockService`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for PATCH requests matching the exact path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();
        responses.get(&(method.to_string(), path.to_string())).cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl TowerService<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        // Unmatched requests get a 404
        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, not_found_json("resource", &path)));

        let requests = self.requests.clone();
        Box::pin(async move {
            let body_bytes = req.into_body().collect_bytes().await?;
            requests.lock().unwrap().push(RecordedRequest {
                method,
                path,
                body: String::from_utf8_lossy(&body_bytes).into_owned(),
            });

            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

fn api_error(code: u16, reason: &str, message: &str) -> WaypostError {
    WaypostError::KubeError(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: reason.to_string(),
        code,
    }))
}

fn metadata(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        generation: Some(1),
        ..Default::default()
    }
}

/// Gateway of the test class with listeners given as (name, protocol, port, hostname)
pub fn make_gateway(
    namespace: &str,
    name: &str,
    listeners: &[(&str, &str, i32, Option<&str>)],
) -> Gateway {
    let mut gateway = Gateway::new(
        name,
        GatewaySpec {
            gateway_class_name: TEST_GATEWAY_CLASS.to_string(),
            listeners: listeners
                .iter()
                .map(|(name, protocol, port, hostname)| Listener {
                    name: name.to_string(),
                    hostname: hostname.map(str::to_string),
                    port: *port,
                    protocol: protocol.to_string(),
                    tls: None,
                    allowed_routes: None,
                })
                .collect(),
        },
    );
    gateway.metadata = metadata(namespace, name);
    gateway
}

/// HTTPRoute with a single `PathPrefix /` rule forwarding to the given backends
pub fn make_route(
    namespace: &str,
    name: &str,
    parent_refs: &[ParentReference],
    backend_refs: &[HTTPBackendRef],
) -> HTTPRoute {
    let mut route = HTTPRoute::new(
        name,
        HTTPRouteSpec {
            parent_refs: parent_refs.to_vec(),
            hostnames: vec![],
            rules: vec![HTTPRouteRule {
                matches: vec![HTTPRouteMatch {
                    path: Some(HTTPPathMatch {
                        match_type: Some("PathPrefix".to_string()),
                        value: Some("/".to_string()),
                    }),
                    method: None,
                }],
                backend_refs: backend_refs.to_vec(),
            }],
        },
    );
    route.metadata = metadata(namespace, name);
    route
}

pub fn parent_ref(namespace: &str, name: &str, section_name: Option<&str>) -> ParentReference {
    ParentReference {
        namespace: Some(namespace.to_string()),
        name: name.to_string(),
        section_name: section_name.map(str::to_string),
        ..Default::default()
    }
}

pub fn backend_ref(namespace: Option<&str>, name: &str, port: Option<i32>) -> HTTPBackendRef {
    HTTPBackendRef {
        namespace: namespace.map(str::to_string),
        name: name.to_string(),
        port,
        ..Default::default()
    }
}

pub fn make_service(namespace: &str, name: &str, ports: &[i32]) -> Service {
    Service {
        metadata: metadata(namespace, name),
        spec: Some(ServiceSpec {
            ports: Some(
                ports
                    .iter()
                    .map(|port| ServicePort {
                        port: *port,
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn make_tls_secret(namespace: &str, name: &str) -> Secret {
    Secret {
        metadata: metadata(namespace, name),
        type_: Some(core::TLS_SECRET_TYPE.to_string()),
        data: Some(BTreeMap::from([
            ("tls.crt".to_string(), ByteString(b"cert".to_vec())),
            ("tls.key".to_string(), ByteString(b"key".to_vec())),
        ])),
        ..Default::default()
    }
}

/// ReferenceGrant in `namespace` allowing `from_kind` objects in `from_namespace` to refer to
/// any `to_kind` object
pub fn make_reference_grant(
    namespace: &str,
    name: &str,
    from_kind: &str,
    from_namespace: &str,
    to_kind: &str,
) -> ReferenceGrant {
    let group_of = |kind: &str| match kind {
        core::SERVICE_KIND | core::SECRET_KIND => core::GROUP.to_string(),
        _ => gateway_api::GROUP.to_string(),
    };

    let mut grant = ReferenceGrant::new(
        name,
        ReferenceGrantSpec {
            from: vec![ReferenceGrantFrom {
                group: group_of(from_kind),
                kind: from_kind.to_string(),
                namespace: from_namespace.to_string(),
            }],
            to: vec![ReferenceGrantTo {
                group: group_of(to_kind),
                kind: to_kind.to_string(),
                name: None,
            }],
        },
    );
    grant.metadata = metadata(namespace, name);
    grant
}

/// In-memory getter
pub struct FakeGetter<K> {
    objects: Mutex<HashMap<NamespacedName, K>>,
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl<K: TrackedKind> FakeGetter<K> {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            failure: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, object: K) {
        let name = NamespacedName::from_resource(&object);
        self.objects.lock().unwrap().insert(name, object);
    }

    /// Make every following get fail with a server error
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<K: TrackedKind> Getter<K> for FakeGetter<K> {
    async fn get(&self, name: &NamespacedName) -> Result<Option<K>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(api_error(500, "InternalError", &message));
        }
        Ok(self.objects.lock().unwrap().get(name).cloned())
    }
}

/// Records warnings as (object, reason, message)
#[derive(Default)]
pub struct FakeRecorder {
    warnings: Mutex<Vec<(ObjectReference, String, String)>>,
}

impl FakeRecorder {
    pub fn warnings(&self) -> Vec<(ObjectReference, String, String)> {
        self.warnings.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRecorder for FakeRecorder {
    async fn record_warning(&self, resource: &ObjectReference, reason: &str, message: String) {
        self.warnings
            .lock()
            .unwrap()
            .push((resource.clone(), reason.to_string(), message));
    }
}

/// Records every apply attempt, failing and hanging ones included
#[derive(Default)]
pub struct FakeApplier {
    applied: Mutex<Vec<DataplaneConfig>>,
    failing: AtomicBool,
    hanging: AtomicBool,
}

impl FakeApplier {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every following apply block forever, like a proxy that stopped answering
    pub fn set_hanging(&self, hanging: bool) {
        self.hanging.store(hanging, Ordering::SeqCst);
    }

    pub fn applied(&self) -> Vec<DataplaneConfig> {
        self.applied.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<DataplaneConfig> {
        self.applied.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ConfigApplier for FakeApplier {
    async fn apply(&self, config: &DataplaneConfig) -> Result<()> {
        self.applied.lock().unwrap().push(config.clone());
        if self.hanging.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(WaypostError::IoError(std::io::Error::other("proxy reload failed")));
        }
        Ok(())
    }
}

/// Records successful status writes
#[derive(Default)]
pub struct FakeStatusSink {
    writes: Mutex<Vec<(StatusKey, ResourceStatus)>>,
    failing: AtomicBool,
}

impl FakeStatusSink {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<(StatusKey, ResourceStatus)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSink for FakeStatusSink {
    async fn write(&self, key: &StatusKey, status: &ResourceStatus) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(api_error(409, "Conflict", "the object has been modified"));
        }
        self.writes
            .lock()
            .unwrap()
            .push((key.clone(), status.clone()));
        Ok(())
    }
}
