//! Resource kind definitions
//!
//! The closed set of Kubernetes resource kinds that appear in a topology
//! snapshot. Wire values are matched case-insensitively so payloads using
//! either the long (`persistentvolumeclaim`) or short (`pvc`) spelling decode
//! to the same variant.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Enumeration of every resource kind a topology node can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Namespace,
    Pod,
    Service,
    Deployment,
    Ingress,
    ReplicaSet,
    Secret,
    ConfigMap,
    PersistentVolumeClaim,
    PersistentVolume,
}

impl ResourceKind {
    /// Get the display name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Namespace => "Namespace",
            ResourceKind::Pod => "Pod",
            ResourceKind::Service => "Service",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::Secret => "Secret",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::PersistentVolume => "PersistentVolume",
        }
    }

    /// Lowercase name used on the wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::Pod => "pod",
            ResourceKind::Service => "service",
            ResourceKind::Deployment => "deployment",
            ResourceKind::Ingress => "ingress",
            ResourceKind::ReplicaSet => "replicaset",
            ResourceKind::Secret => "secret",
            ResourceKind::ConfigMap => "configmap",
            ResourceKind::PersistentVolumeClaim => "persistentvolumeclaim",
            ResourceKind::PersistentVolume => "persistentvolume",
        }
    }

    /// Try to parse a string into a ResourceKind, returning None if invalid
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Get all resource kinds
    pub fn all() -> &'static [Self] {
        &[
            ResourceKind::Namespace,
            ResourceKind::Pod,
            ResourceKind::Service,
            ResourceKind::Deployment,
            ResourceKind::Ingress,
            ResourceKind::ReplicaSet,
            ResourceKind::Secret,
            ResourceKind::ConfigMap,
            ResourceKind::PersistentVolumeClaim,
            ResourceKind::PersistentVolume,
        ]
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self, ResourceKind::Namespace)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    /// Case-insensitive, accepting plural and short forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "namespace" | "namespaces" | "ns" => Ok(ResourceKind::Namespace),
            "pod" | "pods" | "po" => Ok(ResourceKind::Pod),
            "service" | "services" | "svc" => Ok(ResourceKind::Service),
            "deployment" | "deployments" | "deploy" => Ok(ResourceKind::Deployment),
            "ingress" | "ingresses" | "ing" => Ok(ResourceKind::Ingress),
            "replicaset" | "replicasets" | "rs" => Ok(ResourceKind::ReplicaSet),
            "secret" | "secrets" => Ok(ResourceKind::Secret),
            "configmap" | "configmaps" | "cm" => Ok(ResourceKind::ConfigMap),
            "persistentvolumeclaim" | "persistentvolumeclaims" | "pvc" => {
                Ok(ResourceKind::PersistentVolumeClaim)
            }
            "persistentvolume" | "persistentvolumes" | "pv" => Ok(ResourceKind::PersistentVolume),
            _ => Err(format!("Unknown resource kind: {}", s)),
        }
    }
}

impl Serialize for ResourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for ResourceKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
