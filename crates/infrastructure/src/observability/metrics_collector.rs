//! 同步服务指标

use std::time::Duration;

use anyhow::Result;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use datasync_core::models::UploadKind;

/// 安装全局 Prometheus 记录器，返回用于渲染 `/metrics` 的句柄
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))?;
    info!("Prometheus metrics recorder installed");
    Ok(handle)
}

/// 指标记录入口，未安装记录器时所有调用为空操作
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    pub fn record_sync_request(&self, success: bool, duration: Duration) {
        let outcome = if success { "success" } else { "failure" };
        counter!("datasync_sync_requests_total", "outcome" => outcome).increment(1);
        histogram!("datasync_sync_request_duration_seconds").record(duration.as_secs_f64());
    }

    /// `found` 为本次被标记完成的样本数
    pub fn record_reconciliation(&self, success: bool, found: usize) {
        let outcome = if success { "success" } else { "failure" };
        counter!("datasync_reconciliations_total", "outcome" => outcome).increment(1);
        counter!("datasync_reconciled_found_total").increment(found as u64);
    }

    pub fn record_upload(&self, kind: UploadKind, written: bool, bytes: usize) {
        let outcome = if written { "success" } else { "failure" };
        counter!("datasync_uploads_total", "kind" => kind.as_str(), "outcome" => outcome)
            .increment(1);
        if written {
            counter!("datasync_upload_bytes_total", "kind" => kind.as_str())
                .increment(bytes as u64);
        }
    }

    pub fn record_http_request(&self, method: &str, status: u16, duration: Duration) {
        counter!(
            "datasync_http_requests_total",
            "method" => method.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
        histogram!("datasync_http_request_duration_seconds").record(duration.as_secs_f64());
    }
}
