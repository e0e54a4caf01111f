use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// ---------------------------------------------------------------------------
// Metrics catalog
// ---------------------------------------------------------------------------

/// Install the Prometheus recorder. Must run before any metrics are recorded.
pub fn install_prometheus_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Register all metric descriptors at startup.
pub fn describe_all_metrics() {
    describe_counter!(
        "coursecast_catalog_rebuilds_total",
        "Catalog rebuilds by outcome"
    );
    describe_histogram!(
        "coursecast_catalog_rebuild_duration_seconds",
        "Wall time of one full catalog rebuild"
    );
    describe_counter!(
        "coursecast_catalog_cache_hits_total",
        "Catalog requests answered from the valid cache"
    );
    describe_counter!(
        "coursecast_catalog_cache_misses_total",
        "Catalog requests that found the cache empty or stale"
    );
    describe_gauge!("coursecast_catalog_courses", "Courses in the last catalog");
    describe_gauge!("coursecast_catalog_videos", "Videos in the last catalog");
    describe_counter!(
        "coursecast_signed_urls_issued_total",
        "Signed URLs issued by the store (cache misses only)"
    );
    describe_gauge!(
        "coursecast_url_cache_entries",
        "Entries in the signed-URL cache"
    );
    describe_counter!(
        "coursecast_subtitle_requests_total",
        "Subtitle proxy requests by format"
    );
    describe_counter!(
        "coursecast_delivery_requests_total",
        "API requests by endpoint"
    );
}

pub fn record_catalog_rebuild(outcome: &'static str, seconds: f64) {
    counter!("coursecast_catalog_rebuilds_total", "outcome" => outcome).increment(1);
    histogram!("coursecast_catalog_rebuild_duration_seconds").record(seconds);
}

pub fn inc_catalog_cache_hit() {
    counter!("coursecast_catalog_cache_hits_total").increment(1);
}

pub fn inc_catalog_cache_miss() {
    counter!("coursecast_catalog_cache_misses_total").increment(1);
}

pub fn set_catalog_sizes(courses: f64, videos: f64) {
    gauge!("coursecast_catalog_courses").set(courses);
    gauge!("coursecast_catalog_videos").set(videos);
}

pub fn inc_signed_urls_issued() {
    counter!("coursecast_signed_urls_issued_total").increment(1);
}

pub fn set_url_cache_entries(entries: f64) {
    gauge!("coursecast_url_cache_entries").set(entries);
}

pub fn inc_subtitle_request(format: &'static str) {
    counter!("coursecast_subtitle_requests_total", "format" => format).increment(1);
}

pub fn inc_delivery_request(endpoint: &'static str) {
    counter!("coursecast_delivery_requests_total", "endpoint" => endpoint).increment(1);
}
