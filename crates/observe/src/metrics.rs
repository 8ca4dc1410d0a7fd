use {
    prometheus::Encoder,
    std::{collections::HashMap, sync::OnceLock},
};

/// Global metrics registry used by all components.
static REGISTRY: OnceLock<prometheus_metric_storage::StorageRegistry> = OnceLock::new();

/// Configure global metrics registry.
///
/// This function allows specifying common prefix that will be added
/// to all metric names, as well as common labels.
///
/// Later calls, or calls after the registry was already used, are ignored.
pub fn setup_registry(
    prefix: Option<String>,
    labels: Option<HashMap<String, String>>,
) -> Result<(), prometheus::Error> {
    let registry = prometheus::Registry::new_custom(prefix, labels)?;
    let storage_registry = prometheus_metric_storage::StorageRegistry::new(registry);
    if REGISTRY.set(storage_registry).is_err() {
        tracing::debug!("metrics registry was already initialized");
    }
    Ok(())
}

/// Get the global instance of the metrics registry.
pub fn get_registry() -> &'static prometheus::Registry {
    get_storage_registry().registry()
}

/// Get the global instance of the metric storage registry.
///
/// If the registry was not configured with [`setup_registry`] it is
/// initialized with default values, which keeps unit tests simple.
pub fn get_storage_registry() -> &'static prometheus_metric_storage::StorageRegistry {
    REGISTRY.get_or_init(prometheus_metric_storage::StorageRegistry::default)
}

/// Renders all metrics of the registry in the prometheus text format.
pub fn encode(registry: &prometheus::Registry) -> Result<String, prometheus::Error> {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        let registry = prometheus::Registry::new();
        let counter = prometheus::IntCounter::new("probes", "number of probes").unwrap();
        registry.register(Box::new(counter.clone())).unwrap();
        counter.inc();

        let text = encode(&registry).unwrap();
        assert!(text.contains("probes 1"));
    }
}
