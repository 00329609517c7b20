use crate::sniffer::filter::Filter;
use crate::utils::error::{ProbeError, Result};
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, NetworkInterface};
use std::time::{Duration, Instant};

/// Poll interval used when the capture has an overall deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Anything that yields raw Ethernet frames.
pub trait PacketSource {
    /// Next frame, or `None` if the read timed out without one.
    fn next_packet(&mut self) -> Result<Option<Vec<u8>>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub seen: usize,
    pub matched: usize,
    pub timed_out: bool,
}

/// Frames from a live interface through a pnet datalink channel.
pub struct DatalinkSource {
    interface: NetworkInterface,
    rx: Box<dyn DataLinkReceiver>,
}

impl DatalinkSource {
    /// Opens `name`, or the first usable interface when `name` is `None`.
    pub fn open(name: Option<&str>, read_timeout: Option<Duration>) -> Result<Self> {
        let interface = select_interface(&datalink::interfaces(), name)?;
        let config = Config {
            read_timeout,
            ..Default::default()
        };

        let rx = match datalink::channel(&interface, config) {
            Ok(Channel::Ethernet(_tx, rx)) => rx,
            Ok(_) => {
                return Err(ProbeError::Capture {
                    message: format!("non-ethernet channel for {}", interface.name),
                })
            }
            Err(e) => {
                return Err(ProbeError::Capture {
                    message: format!("unable to open channel on {}: {}", interface.name, e),
                })
            }
        };

        tracing::info!("Listening on {}", interface.name);
        Ok(Self { interface, rx })
    }

    pub fn interface(&self) -> &NetworkInterface {
        &self.interface
    }
}

impl PacketSource for DatalinkSource {
    fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
        match self.rx.next() {
            Ok(frame) => Ok(Some(frame.to_vec())),
            Err(e) if matches!(e.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock) => {
                Ok(None)
            }
            Err(e) => Err(ProbeError::Capture {
                message: format!("read failed on {}: {}", self.interface.name, e),
            }),
        }
    }
}

/// One line per interface: name, MAC, addresses and state.
pub fn list_interfaces() -> Vec<String> {
    datalink::interfaces().iter().map(describe_interface).collect()
}

fn describe_interface(interface: &NetworkInterface) -> String {
    let mac = interface
        .mac
        .map(|mac| mac.to_string())
        .unwrap_or_else(|| "-".to_string());
    let ips = interface
        .ips
        .iter()
        .map(|ip| ip.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let state = if interface.is_up() { "up" } else { "down" };
    format!("{:<16} {:<17} {:<4} {}", interface.name, mac, state, ips)
}

fn usable(interface: &NetworkInterface) -> bool {
    interface.is_up()
        && !interface.is_loopback()
        && interface.mac.is_some_and(|mac| !mac.is_zero())
        && !interface.ips.is_empty()
}

pub fn select_interface(
    interfaces: &[NetworkInterface],
    name: Option<&str>,
) -> Result<NetworkInterface> {
    let found = match name {
        Some(name) => interfaces.iter().find(|i| i.name == name),
        None => interfaces.iter().find(|i| usable(i)),
    };
    found.cloned().ok_or_else(|| ProbeError::InterfaceNotFound {
        name: name.unwrap_or("<default>").to_string(),
    })
}

/// Reads frames until `count` of them pass `filter` (0 means no limit) or `timeout`
/// expires. Each matching frame is handed to `on_match`.
pub fn sniff<P, F>(
    source: &mut P,
    filter: &Filter,
    count: usize,
    timeout: Option<Duration>,
    mut on_match: F,
) -> Result<CaptureStats>
where
    P: PacketSource + ?Sized,
    F: FnMut(&[u8]),
{
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut stats = CaptureStats::default();
    tracing::debug!("Sniffing with filter '{}' for {} packets", filter, count);

    while count == 0 || stats.matched < count {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            stats.timed_out = true;
            tracing::info!("Capture timed out after {} matching packets", stats.matched);
            break;
        }

        let Some(frame) = source.next_packet()? else {
            continue;
        };
        stats.seen += 1;
        if filter.matches(&frame) {
            stats.matched += 1;
            on_match(&frame);
        }
    }
    Ok(stats)
}

/// Read timeout for the channel: short polls when there is an overall deadline.
pub fn read_timeout_for(timeout: Option<Duration>) -> Option<Duration> {
    timeout.map(|t| t.min(POLL_INTERVAL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sniffer::frames;
    use pnet::datalink::MacAddr;
    use pnet::ipnetwork::{IpNetwork, Ipv4Network};
    use std::collections::VecDeque;
    use std::net::Ipv4Addr;

    struct ScriptedSource {
        frames: VecDeque<Option<Vec<u8>>>,
        reads: usize,
    }

    impl ScriptedSource {
        fn new(frames: Vec<Option<Vec<u8>>>) -> Self {
            Self {
                frames: frames.into(),
                reads: 0,
            }
        }
    }

    impl PacketSource for ScriptedSource {
        fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
            self.reads += 1;
            self.frames.pop_front().ok_or_else(|| ProbeError::Capture {
                message: "source exhausted".to_string(),
            })
        }
    }

    #[test]
    fn test_count_one_stops_after_first_match() {
        let mut source = ScriptedSource::new(vec![
            Some(frames::arp_request([10, 0, 0, 1], [10, 0, 0, 2])),
            None,
            Some(frames::ipv4_udp([10, 0, 0, 1], [10, 0, 0, 53], 5353, 53, b"x")),
            Some(frames::ipv4_tcp([10, 0, 0, 1], [10, 0, 0, 2], 1234, 80, b"")),
        ]);
        let filter = Filter::parse("ip and (tcp or udp)").unwrap();
        let mut captured = Vec::new();

        let stats = sniff(&mut source, &filter, 1, None, |frame| captured.push(frame.to_vec())).unwrap();

        assert_eq!(stats.seen, 2);
        assert_eq!(stats.matched, 1);
        assert!(!stats.timed_out);
        assert_eq!(source.reads, 3);
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].len(), 14 + 20 + 8 + 1);
    }

    #[test]
    fn test_source_errors_propagate() {
        let mut source = ScriptedSource::new(vec![Some(frames::arp_request(
            [10, 0, 0, 1],
            [10, 0, 0, 2],
        ))]);
        let filter = Filter::parse("tcp").unwrap();
        let err = sniff(&mut source, &filter, 1, None, |_| {}).unwrap_err();
        assert!(matches!(err, ProbeError::Capture { .. }));
    }

    #[test]
    fn test_deadline_stops_capture() {
        let mut source = ScriptedSource::new(vec![None; 3]);
        let filter = Filter::parse("").unwrap();
        let stats = sniff(&mut source, &filter, 1, Some(Duration::ZERO), |_| {}).unwrap();
        assert!(stats.timed_out);
        assert_eq!(stats.matched, 0);
        assert_eq!(source.reads, 0);
    }

    #[test]
    fn test_read_timeout_for() {
        assert_eq!(read_timeout_for(None), None);
        assert_eq!(
            read_timeout_for(Some(Duration::from_secs(5))),
            Some(POLL_INTERVAL)
        );
        assert_eq!(
            read_timeout_for(Some(Duration::from_millis(20))),
            Some(Duration::from_millis(20))
        );
    }

    // IFF_UP and IFF_LOOPBACK as defined by Linux
    #[cfg(target_os = "linux")]
    fn iface(name: &str, flags: u32, mac: Option<MacAddr>) -> NetworkInterface {
        NetworkInterface {
            name: name.into(),
            description: String::new(),
            index: 1,
            mac,
            ips: vec![IpNetwork::V4(
                Ipv4Network::new(Ipv4Addr::new(192, 168, 1, 100), 24).unwrap(),
            )],
            flags,
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_select_interface() {
        let mac = Some(MacAddr::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff));
        let interfaces = vec![
            iface("lo", 0x1 | 0x8, Some(MacAddr::zero())),
            iface("eth0", 0x0, mac),
            iface("eth1", 0x1, mac),
        ];

        assert_eq!(select_interface(&interfaces, None).unwrap().name, "eth1");
        assert_eq!(select_interface(&interfaces, Some("eth0")).unwrap().name, "eth0");
        assert!(matches!(
            select_interface(&interfaces, Some("wlan9")),
            Err(ProbeError::InterfaceNotFound { name }) if name == "wlan9"
        ));
        assert!(matches!(
            select_interface(&interfaces[..2], None),
            Err(ProbeError::InterfaceNotFound { .. })
        ));
    }
}
