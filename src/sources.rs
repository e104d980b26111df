use crate::traits::ConnectorRegistry;

/// Configured connector, as listed by `sieve sources`.
#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub name: String,
    pub connector_type: String,
    pub description: String,
}

pub fn get_sources(registry: &ConnectorRegistry) -> Vec<SourceStatus> {
    registry
        .connectors()
        .iter()
        .map(|c| SourceStatus {
            name: c.name().to_string(),
            connector_type: c.connector_type().to_string(),
            description: c.description().to_string(),
        })
        .collect()
}

pub fn list_sources(registry: &ConnectorRegistry) {
    println!("{:<16} {:<12} DESCRIPTION", "SOURCE", "TYPE");
    for s in get_sources(registry) {
        println!("{:<16} {:<12} {}", s.name, s.connector_type, s.description);
    }
    if registry.is_empty() {
        println!("(no connectors configured)");
    }
}
