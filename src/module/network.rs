//! The `network` module: interface up/down state and rx/tx throughput
//! (spec §4.13, C13, "Timer, interface stats"). `NetworkSource` is the
//! seam a `/sys/class/net`-reading adapter plugs into; out of scope per §1.

use std::sync::Arc;
use std::time::Duration;

use crate::module::runtime::{spawn_timer, Poll};
use crate::module::Module;

/// A single sample of an interface's cumulative counters.
#[derive(Debug, Clone, Copy)]
pub struct NetworkSample {
    /// Whether the interface currently reports carrier/link.
    pub up: bool,
    /// Cumulative bytes received.
    pub rx_bytes: u64,
    /// Cumulative bytes transmitted.
    pub tx_bytes: u64,
}

/// Narrow collaborator sampled once per tick for one network interface.
pub trait NetworkSource: Send + 'static {
    /// Sample the interface, or `None` if it has disappeared.
    fn sample(&mut self) -> Option<NetworkSample>;
}

struct NetworkPoller<S> {
    iface: String,
    source: S,
    last: Option<NetworkSample>,
}

impl<S: NetworkSource> Poll for NetworkPoller<S> {
    fn poll(&mut self) -> Option<String> {
        let sample = self.source.sample()?;
        if !sample.up {
            self.last = Some(sample);
            return Some(format!("{}: down", self.iface));
        }
        let (rx_rate, tx_rate) = match self.last {
            Some(prev) => (sample.rx_bytes.saturating_sub(prev.rx_bytes), sample.tx_bytes.saturating_sub(prev.tx_bytes)),
            None => (0, 0),
        };
        self.last = Some(sample);
        Some(format!("{}: {}B/s down {}B/s up", self.iface, rx_rate, tx_rate))
    }
}

/// Start the `network` module for `iface`, polling every `interval`.
pub fn start(module: Arc<Module>, iface: impl Into<String>, interval: Duration, source: impl NetworkSource) -> tokio::task::JoinHandle<()> {
    spawn_timer(module, interval, NetworkPoller { iface: iface.into(), source, last: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sequence(std::collections::VecDeque<NetworkSample>);
    impl NetworkSource for Sequence {
        fn sample(&mut self) -> Option<NetworkSample> {
            self.0.pop_front()
        }
    }

    #[test]
    fn reports_down_interface_without_rates() {
        let mut poller = NetworkPoller {
            iface: "eth0".to_string(),
            source: Sequence(vec![NetworkSample { up: false, rx_bytes: 0, tx_bytes: 0 }].into()),
            last: None,
        };
        assert_eq!(poller.poll(), Some("eth0: down".to_string()));
    }

    #[test]
    fn computes_delta_rate_between_two_samples() {
        let mut poller = NetworkPoller {
            iface: "eth0".to_string(),
            source: Sequence(
                vec![
                    NetworkSample { up: true, rx_bytes: 1000, tx_bytes: 500 },
                    NetworkSample { up: true, rx_bytes: 1500, tx_bytes: 600 },
                ]
                .into(),
            ),
            last: None,
        };
        assert_eq!(poller.poll(), Some("eth0: 0B/s down 0B/s up".to_string()));
        assert_eq!(poller.poll(), Some("eth0: 500B/s down 100B/s up".to_string()));
    }
}
