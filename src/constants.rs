// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The operator name used for server-side apply and as event reporter
pub const OPERATOR_NAME: &str = "waypost";

/// Default controller name reported in HTTPRoute parent statuses
pub const DEFAULT_CONTROLLER_NAME: &str = "waypost.dev/gateway-controller";

/// Gateway API group and kinds
pub mod gateway_api {
    pub const GROUP: &str = "gateway.networking.k8s.io";
    pub const GATEWAY_KIND: &str = "Gateway";
    pub const HTTP_ROUTE_KIND: &str = "HTTPRoute";
    pub const REFERENCE_GRANT_KIND: &str = "ReferenceGrant";
}

/// Core API group (empty string) and kinds
pub mod core {
    pub const GROUP: &str = "";
    pub const SERVICE_KIND: &str = "Service";
    pub const SECRET_KIND: &str = "Secret";
    pub const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";
}

/// Condition types and reasons written to resource status
pub mod conditions {
    pub const ACCEPTED: &str = "Accepted";
    pub const RESOLVED_REFS: &str = "ResolvedRefs";
    pub const CONFLICTED: &str = "Conflicted";

    pub const STATUS_TRUE: &str = "True";
    pub const STATUS_FALSE: &str = "False";

    pub const REASON_ACCEPTED: &str = "Accepted";
    pub const REASON_RESOLVED_REFS: &str = "ResolvedRefs";
    pub const REASON_NO_CONFLICTS: &str = "NoConflicts";
    pub const REASON_LISTENERS_NOT_VALID: &str = "ListenersNotValid";
}

/// Reasons for Kubernetes Events recorded against resources
pub mod event_reasons {
    /// The resource failed webhook-equivalent validation
    pub const REJECTED: &str = "Rejected";
    /// Action reported with recorded events
    pub const RECONCILE: &str = "Reconcile";
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Retry policy for transient fetch errors in the watch runners
pub mod retry {
    pub const INITIAL_DELAY_SECS: u64 = 1;
    pub const MAX_DELAY_SECS: u64 = 30;
    pub const MAX_ATTEMPTS: u32 = 5;
}
