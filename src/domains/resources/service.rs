//! Resource service implementation.
//!
//! The ResourceService manages resource discovery and access.
//! Resources are defined in `definitions/` and registered via `registry.rs`.

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::model::{ReadResourceResult, Resource, ResourceContents};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::error::ResourceError;
use super::registry::get_all_resources;
use crate::core::config::Config;

/// Service for listing and reading resources.
pub struct ResourceService {
    config: Arc<Config>,

    /// Key: resource URI.
    resources: BTreeMap<String, ResourceEntry>,
}

/// An entry in the resource registry.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    /// The resource metadata.
    pub resource: Resource,

    /// The content provider for this resource.
    pub content: ResourceContent,
}

/// Different types of resource content.
#[derive(Debug, Clone)]
pub enum ResourceContent {
    /// Static JSON document.
    Json(Value),

    /// Content computed at read time.
    Dynamic(DynamicResourceType),
}

/// Types of dynamic resources.
#[derive(Debug, Clone, Copy)]
pub enum DynamicResourceType {
    /// Server identity and upstream client settings.
    ServerInfo,
}

impl ResourceService {
    pub fn new(config: Arc<Config>) -> Self {
        let mut service = Self {
            config,
            resources: BTreeMap::new(),
        };
        for entry in get_all_resources() {
            service.register_resource(entry);
        }
        info!("ResourceService ready with {} resources", service.resources.len());
        service
    }

    /// Register a resource.
    pub fn register_resource(&mut self, entry: ResourceEntry) {
        debug!("Registering resource: {}", entry.resource.raw.uri);
        self.resources
            .insert(entry.resource.raw.uri.to_string(), entry);
    }

    /// List all available resources, ordered by URI.
    pub async fn list_resources(&self) -> Vec<Resource> {
        self.resources
            .values()
            .map(|entry| entry.resource.clone())
            .collect()
    }

    /// Read a resource by URI.
    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, ResourceError> {
        let entry = self
            .resources
            .get(uri)
            .ok_or_else(|| ResourceError::not_found(uri))?;

        let document = match &entry.content {
            ResourceContent::Json(value) => value.clone(),
            ResourceContent::Dynamic(kind) => self.resolve_dynamic_content(*kind),
        };
        let text = serde_json::to_string_pretty(&document)
            .map_err(|e| ResourceError::internal(e.to_string()))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::TextResourceContents {
                uri: uri.to_string(),
                mime_type: entry.resource.raw.mime_type.clone(),
                text,
                meta: None,
            }],
        })
    }

    fn resolve_dynamic_content(&self, kind: DynamicResourceType) -> Value {
        match kind {
            DynamicResourceType::ServerInfo => {
                let upstream = &self.config.upstream;
                json!({
                    "server": self.config.server.name,
                    "version": self.config.server.version,
                    "transport": self.config.transport.description(),
                    "upstream": {
                        "base_url": upstream.base_url,
                        "timeout_secs": upstream.timeout_secs,
                        "rate_limit": {
                            "max_requests": upstream.max_requests,
                            "window_secs": upstream.window_secs,
                        },
                        "max_retries": upstream.max_retries,
                        "retry_base_delay_ms": upstream.retry_base_delay_ms,
                    },
                })
            }
        }
    }
}
