use serde::Serialize;
use std::sync::Mutex;

const MAX_LATENCY_RECORDS: usize = 100;

/// ローカルメトリクス収集器
pub struct Metrics {
    counters: Mutex<MetricsCounters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct MetricsCounters {
    uploads_submitted: u64,
    upload_failures: u64,
    polls_issued: u64,
    poll_failures: u64,
    jobs_completed: u64,
    jobs_failed: u64,
    downloads_saved: u64,
    download_failures: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub phase: String,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー（UIに返す用）
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub uploads_submitted: u64,
    pub upload_failures: u64,
    pub polls_issued: u64,
    pub poll_failures: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub downloads_saved: u64,
    pub download_failures: u64,
    pub avg_latency_ms: AvgLatency,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvgLatency {
    pub upload: Option<f64>,
    pub download: Option<f64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(MetricsCounters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn inc_uploads_submitted(&self) {
        self.counters.lock().unwrap().uploads_submitted += 1;
    }

    pub fn inc_upload_failures(&self) {
        self.counters.lock().unwrap().upload_failures += 1;
    }

    pub fn inc_polls_issued(&self) {
        self.counters.lock().unwrap().polls_issued += 1;
    }

    pub fn inc_poll_failures(&self) {
        self.counters.lock().unwrap().poll_failures += 1;
    }

    pub fn inc_jobs_completed(&self) {
        self.counters.lock().unwrap().jobs_completed += 1;
    }

    pub fn inc_jobs_failed(&self) {
        self.counters.lock().unwrap().jobs_failed += 1;
    }

    pub fn inc_downloads_saved(&self) {
        self.counters.lock().unwrap().downloads_saved += 1;
    }

    pub fn inc_download_failures(&self) {
        self.counters.lock().unwrap().download_failures += 1;
    }

    pub fn record_latency(&self, phase: &str, duration_ms: u64) {
        let mut latencies = self.latencies.lock().unwrap();
        latencies.push(LatencyRecord {
            phase: phase.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
        if latencies.len() > MAX_LATENCY_RECORDS {
            latencies.remove(0);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let counters = self.counters.lock().unwrap();
        let latencies = self.latencies.lock().unwrap();

        MetricsSummary {
            uploads_submitted: counters.uploads_submitted,
            upload_failures: counters.upload_failures,
            polls_issued: counters.polls_issued,
            poll_failures: counters.poll_failures,
            jobs_completed: counters.jobs_completed,
            jobs_failed: counters.jobs_failed,
            downloads_saved: counters.downloads_saved,
            download_failures: counters.download_failures,
            avg_latency_ms: AvgLatency {
                upload: avg_for(&latencies, "upload"),
                download: avg_for(&latencies, "download"),
            },
        }
    }
}

fn avg_for(latencies: &[LatencyRecord], phase: &str) -> Option<f64> {
    let values: Vec<u64> = latencies
        .iter()
        .filter(|r| r.phase == phase)
        .map(|r| r.duration_ms)
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<u64>() as f64 / values.len() as f64)
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
