use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_transition(transition: &'static str) {
    metrics::counter!("test_transitions_total", "transition" => transition).increment(1);
}

pub(crate) fn record_test_mistake(kind: &'static str) {
    metrics::counter!("test_mistakes_total", "kind" => kind).increment(1);
}

pub(crate) fn record_ledger_change(change: &'static str) {
    metrics::counter!("mistake_ledger_changes_total", "change" => change).increment(1);
}
