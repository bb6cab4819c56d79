use lazy_static::lazy_static;
use log::error;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

lazy_static! {
    pub static ref BLOCKS_ENCODED: IntCounter =
        register_int_counter!("fountain_blocks_encoded_total", "Number of encoded blocks produced").unwrap();
    pub static ref ROWS_ACCEPTED: IntCounter =
        register_int_counter!("fountain_rows_accepted_total", "Number of blocks accepted as independent rows").unwrap();
    pub static ref ROWS_DEPENDENT: IntCounter =
        register_int_counter!("fountain_rows_dependent_total", "Number of blocks rejected as dependent rows").unwrap();
    pub static ref ROWS_CONFLICTING: IntCounter =
        register_int_counter!("fountain_rows_conflicting_total", "Number of dependent rows with a non-zero residue").unwrap();
    pub static ref DECODES: IntCounter =
        register_int_counter!("fountain_decodes_total", "Number of messages reassembled").unwrap();
}

/// Forces registration so every counter shows up in `render` even at zero.
pub fn init() {
    lazy_static::initialize(&BLOCKS_ENCODED);
    lazy_static::initialize(&ROWS_ACCEPTED);
    lazy_static::initialize(&ROWS_DEPENDENT);
    lazy_static::initialize(&ROWS_CONFLICTING);
    lazy_static::initialize(&DECODES);
}

/// Prometheus text exposition of the default registry.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("metrics encoding failed: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
