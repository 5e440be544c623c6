//! ## lwes-telemetry::metrics
//! Prometheus counters for the receive loop.

use lwes_protocol::Event;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub events: Counter,
    pub decode_errors: Counter,
    pub transport_errors: Counter,
    pub event_attributes: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let events = Counter::new("lwes_events_total", "Decoded events delivered")?;
        let decode_errors = Counter::new(
            "lwes_decode_errors_total",
            "Datagrams rejected by the decoder",
        )?;
        let transport_errors = Counter::new(
            "lwes_transport_errors_total",
            "Socket read failures",
        )?;
        let event_attributes = Histogram::with_opts(
            HistogramOpts::new(
                "lwes_event_attributes",
                "Attributes per decoded event, metadata included",
            )
            .buckets(vec![4.0, 8.0, 16.0, 32.0, 64.0, 256.0]),
        )?;

        registry.register(Box::new(events.clone()))?;
        registry.register(Box::new(decode_errors.clone()))?;
        registry.register(Box::new(transport_errors.clone()))?;
        registry.register(Box::new(event_attributes.clone()))?;

        Ok(Self {
            registry,
            events,
            decode_errors,
            transport_errors,
            event_attributes,
        })
    }

    pub fn record_event(&self, event: &Event) {
        self.events.inc();
        self.event_attributes.observe(event.len() as f64);
    }

    pub fn inc_decode_errors(&self) {
        self.decode_errors.inc();
    }

    pub fn inc_transport_errors(&self) {
        self.transport_errors.inc();
    }

    /// Renders all metrics in the Prometheus text exposition format.
    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_exported() {
        let metrics = MetricsRecorder::new().unwrap();
        let event = lwes_protocol::decode(&[0x01, b'E', 0x00, 0x00]).unwrap();
        metrics.record_event(&event);
        metrics.record_event(&event);
        metrics.inc_decode_errors();

        assert_eq!(metrics.events.get(), 2.0);
        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("lwes_events_total 2"));
        assert!(text.contains("lwes_decode_errors_total 1"));
        assert!(text.contains("lwes_transport_errors_total 0"));
    }
}
