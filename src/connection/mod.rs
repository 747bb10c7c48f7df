//! Store connection
//!
//! Owns a shared store client and the settings every builder inherits.

mod config;

pub use config::{ConfigError, ConnectionConfig};

use std::fmt;
use std::sync::Arc;

use crate::observability::{log_event_with_fields, Event, Logger};
use crate::query::QueryBuilder;
use crate::store::EntityStore;

/// Entry point for building queries over one store client
#[derive(Clone)]
pub struct Connection {
    config: ConnectionConfig,
    client: Arc<dyn EntityStore>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Validates `config`, applies its log level and wraps `client`
    pub fn new(config: ConnectionConfig, client: Arc<dyn EntityStore>) -> Result<Self, ConfigError> {
        config.validate()?;
        Logger::set_min_severity(config.severity()?);

        log_event_with_fields(
            Event::ConnectionOpened,
            &[
                ("namespace", config.namespace.as_deref().unwrap_or("")),
                ("project_id", config.project_id.as_str()),
            ],
        );

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn client(&self) -> Arc<dyn EntityStore> {
        Arc::clone(&self.client)
    }

    /// Untargeted builder carrying the namespace and default timeout
    pub fn query(&self) -> QueryBuilder {
        let builder =
            QueryBuilder::new(self.client()).namespace(self.config.namespace.clone());
        match self.config.timeout_secs {
            Some(secs) => builder.timeout(secs),
            None => builder,
        }
    }

    /// Builder targeted at `kind`
    pub fn table(&self, kind: impl Into<String>) -> QueryBuilder {
        self.query().from(kind)
    }

    /// Same as [`Connection::table`]
    pub fn kind(&self, kind: impl Into<String>) -> QueryBuilder {
        self.table(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_builders_inherit_config() {
        let mut config = ConnectionConfig::for_project("inventory");
        config.namespace = Some("tenant-a".into());
        config.timeout_secs = Some(15);
        let conn = Connection::new(config, Arc::new(MemoryStore::new())).unwrap();

        let state = conn.table("Widget").state().clone();
        assert_eq!(state.kind.as_deref(), Some("Widget"));
        assert_eq!(state.namespace.as_deref(), Some("tenant-a"));
        assert_eq!(state.timeout, Some(15));

        assert!(conn.query().state().kind.is_none());
        assert_eq!(conn.kind("Widget").state(), &state);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = ConnectionConfig::for_project("inventory");
        config.log_level = "loud".into();
        assert!(Connection::new(config, Arc::new(MemoryStore::new())).is_err());
    }

    #[test]
    fn test_namespace_isolates_data() {
        let store = Arc::new(MemoryStore::new());
        let mut config = ConnectionConfig::for_project("inventory");
        config.namespace = Some("tenant-a".into());
        let tenant = Connection::new(config, store.clone()).unwrap();
        let default = Connection::new(ConnectionConfig::for_project("inventory"), store).unwrap();

        let id = tenant
            .table("Widget")
            .insert_get_id(json!({"name": "bolt"}).as_object().cloned().unwrap())
            .unwrap();

        assert!(tenant.table("Widget").find(&id, &[]).unwrap().is_some());
        assert!(default.table("Widget").find(&id, &[]).unwrap().is_none());
    }
}
