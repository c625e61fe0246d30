use actix_web::{http::header::CONTENT_TYPE, HttpResponse};
use crypto_core::FallbackReason;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};

static MESSAGES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "messenger_messages_sent_total",
        "Messages accepted by the send endpoint",
    )
    .expect("failed to create messenger_messages_sent_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register messenger_messages_sent_total");
    counter
});

static DECRYPT_FALLBACK_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "messenger_decrypt_fallback_total",
            "Stored message texts returned without decryption",
        ),
        &["reason"],
    )
    .expect("failed to create messenger_decrypt_fallback_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register messenger_decrypt_fallback_total");
    counter
});

static SEARCH_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "messenger_search_requests_total",
        "Message search requests served",
    )
    .expect("failed to create messenger_search_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register messenger_search_requests_total");
    counter
});

pub fn record_message_sent() {
    MESSAGES_SENT_TOTAL.inc();
}

pub fn record_decrypt_fallback(reason: FallbackReason) {
    DECRYPT_FALLBACK_TOTAL
        .with_label_values(&[reason.as_str()])
        .inc();
}

pub fn record_search() {
    SEARCH_REQUESTS_TOTAL.inc();
}

pub fn decrypt_fallback_count(reason: FallbackReason) -> u64 {
    DECRYPT_FALLBACK_TOTAL
        .with_label_values(&[reason.as_str()])
        .get()
}

pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, encoder.format_type()))
        .body(buffer)
}
