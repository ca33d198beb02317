use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

pub static SEARCH_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "search_requests_total",
        "API requests by route and outcome",
        &["route", "outcome"]
    )
    .unwrap()
});

pub static SEARCH_REQUEST_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "search_request_seconds",
        "API request latency",
        &["route"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap()
});

pub static TAG_CACHE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("tag_cache_total", "Tag catalog cache lookups", &["result"])
        .unwrap()
});

pub static ENGINE_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("engine_errors_total", "Engine errors by kind", &["kind"]).unwrap()
});
