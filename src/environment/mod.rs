//! Deployment environment snapshot
//!
//! Parsed once per build from `VCAP_APPLICATION` and `VCAP_SERVICES`.
//! An unset or empty variable is treated as an empty document.

pub mod services;

pub use services::{
    instances_from_vcap, matching_instances, MatchedInstances, ServiceInstance, ServiceOrigin,
    VcapService, VcapServices,
};

use crate::error::{BuildpackError, BuildpackResult};
use serde::Deserialize;
use services::null_as_default;

/// Metadata about the application being staged (`VCAP_APPLICATION`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VcapApp {
    #[serde(rename = "application_id", deserialize_with = "null_as_default")]
    pub app_id: String,
    #[serde(rename = "application_name", deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "application_uris", deserialize_with = "null_as_default")]
    pub uris: Vec<String>,
    #[serde(rename = "application_version", deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cf_api: String,
    pub limits: Option<Limits>,
}

/// Resource limits of the application's container
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub disk: u64,
    pub fds: u64,
    pub mem: u64,
}

/// Read-only view of the deployment for one build
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub app: VcapApp,
    pub services: Vec<ServiceInstance>,
}

impl Environment {
    /// Parse the snapshot from raw `VCAP_APPLICATION` / `VCAP_SERVICES` values
    pub fn parse(vcap_application: &str, vcap_services: &str) -> BuildpackResult<Self> {
        let app: VcapApp = parse_json("VCAP_APPLICATION", vcap_application)?;
        let services: VcapServices = parse_json("VCAP_SERVICES", vcap_services)?;

        Ok(Self {
            app,
            services: instances_from_vcap(&services),
        })
    }

    /// Read the snapshot from the process environment
    pub fn from_process_env() -> BuildpackResult<Self> {
        let app = std::env::var("VCAP_APPLICATION").unwrap_or_default();
        let services = std::env::var("VCAP_SERVICES").unwrap_or_default();
        Self::parse(&app, &services)
    }
}

fn parse_json<T>(what: &str, raw: &str) -> BuildpackResult<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(raw).map_err(|e| BuildpackError::Parse {
        what: what.to_string(),
        reason: e.to_string(),
    })
}
