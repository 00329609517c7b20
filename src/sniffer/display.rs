//! Layer-by-layer rendering of a captured frame.

use crate::sniffer::filter::{ipv4_transport, ipv6_transport};
use crate::sniffer::hex::raw_data_to_hex;
use pnet::packet::arp::ArpPacket;
use pnet::packet::ethernet::{EtherType, EtherTypes, EthernetPacket};
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::icmpv6::Icmpv6Packet;
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::udp::UdpPacket;
use pnet::packet::Packet;
use std::fmt::Display;

struct Layer {
    name: &'static str,
    fields: Vec<(&'static str, String)>,
}

impl Layer {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    fn field(mut self, key: &'static str, value: impl Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }
}

fn ethertype_name(ethertype: EtherType) -> String {
    let name = match ethertype {
        EtherTypes::Ipv4 => "IPv4",
        EtherTypes::Ipv6 => "IPv6",
        EtherTypes::Arp => "ARP",
        EtherTypes::Vlan => "802.1Q",
        _ => "unknown",
    };
    format!("{} (0x{:04x})", name, ethertype.0)
}

fn protocol_name(protocol: IpNextHeaderProtocol) -> String {
    match protocol {
        IpNextHeaderProtocols::Tcp => "tcp".to_string(),
        IpNextHeaderProtocols::Udp => "udp".to_string(),
        IpNextHeaderProtocols::Icmp => "icmp".to_string(),
        IpNextHeaderProtocols::Icmpv6 => "ipv6-icmp".to_string(),
        other => other.0.to_string(),
    }
}

/// Flag letters in the usual F S R P A U E C order.
fn tcp_flags(flags: u16) -> String {
    const LETTERS: [(u16, char); 8] = [
        (0x01, 'F'),
        (0x02, 'S'),
        (0x04, 'R'),
        (0x08, 'P'),
        (0x10, 'A'),
        (0x20, 'U'),
        (0x40, 'E'),
        (0x80, 'C'),
    ];
    LETTERS
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, letter)| *letter)
        .collect()
}

fn transport_layers(protocol: IpNextHeaderProtocol, data: &[u8], layers: &mut Vec<Layer>) {
    let payload = match protocol {
        IpNextHeaderProtocols::Tcp => TcpPacket::new(data).map(|tcp| {
            layers.push(
                Layer::new("TCP")
                    .field("sport", tcp.get_source())
                    .field("dport", tcp.get_destination())
                    .field("seq", tcp.get_sequence())
                    .field("ack", tcp.get_acknowledgement())
                    .field("dataofs", tcp.get_data_offset())
                    .field("flags", tcp_flags(tcp.get_flags() as u16))
                    .field("window", tcp.get_window())
                    .field("chksum", format!("0x{:04x}", tcp.get_checksum()))
                    .field("urgptr", tcp.get_urgent_ptr()),
            );
            tcp.payload().to_vec()
        }),
        IpNextHeaderProtocols::Udp => UdpPacket::new(data).map(|udp| {
            layers.push(
                Layer::new("UDP")
                    .field("sport", udp.get_source())
                    .field("dport", udp.get_destination())
                    .field("len", udp.get_length())
                    .field("chksum", format!("0x{:04x}", udp.get_checksum())),
            );
            udp.payload().to_vec()
        }),
        IpNextHeaderProtocols::Icmp => IcmpPacket::new(data).map(|icmp| {
            layers.push(
                Layer::new("ICMP")
                    .field("type", icmp.get_icmp_type().0)
                    .field("code", icmp.get_icmp_code().0)
                    .field("chksum", format!("0x{:04x}", icmp.get_checksum())),
            );
            icmp.payload().to_vec()
        }),
        IpNextHeaderProtocols::Icmpv6 => Icmpv6Packet::new(data).map(|icmp| {
            layers.push(
                Layer::new("ICMPv6")
                    .field("type", icmp.get_icmpv6_type().0)
                    .field("code", icmp.get_icmpv6_code().0)
                    .field("cksum", format!("0x{:04x}", icmp.get_checksum())),
            );
            icmp.payload().to_vec()
        }),
        _ => None,
    };

    let payload = payload.unwrap_or_else(|| data.to_vec());
    if !payload.is_empty() {
        layers.push(Layer::new("Raw").field("load", raw_data_to_hex(&payload)));
    }
}

fn decode(frame: &[u8]) -> Vec<Layer> {
    let mut layers = Vec::new();
    let Some(ethernet) = EthernetPacket::new(frame) else {
        if !frame.is_empty() {
            layers.push(Layer::new("Raw").field("load", raw_data_to_hex(frame)));
        }
        return layers;
    };

    layers.push(
        Layer::new("Ethernet")
            .field("dst", ethernet.get_destination())
            .field("src", ethernet.get_source())
            .field("type", ethertype_name(ethernet.get_ethertype())),
    );

    match ethernet.get_ethertype() {
        EtherTypes::Ipv4 => match Ipv4Packet::new(ethernet.payload()) {
            Some(ip) => {
                let tos = (ip.get_dscp() << 2) | ip.get_ecn();
                layers.push(
                    Layer::new("IP")
                        .field("version", ip.get_version())
                        .field("ihl", ip.get_header_length())
                        .field("tos", format!("0x{:x}", tos))
                        .field("len", ip.get_total_length())
                        .field("id", ip.get_identification())
                        .field("flags", ip.get_flags())
                        .field("frag", ip.get_fragment_offset())
                        .field("ttl", ip.get_ttl())
                        .field("proto", protocol_name(ip.get_next_level_protocol()))
                        .field("chksum", format!("0x{:04x}", ip.get_checksum()))
                        .field("src", ip.get_source())
                        .field("dst", ip.get_destination()),
                );
                if ip.get_fragment_offset() == 0 {
                    transport_layers(ip.get_next_level_protocol(), ipv4_transport(&ip), &mut layers);
                } else {
                    let data = ipv4_transport(&ip);
                    if !data.is_empty() {
                        layers.push(Layer::new("Raw").field("load", raw_data_to_hex(data)));
                    }
                }
            }
            None => layers.push(Layer::new("Raw").field("load", raw_data_to_hex(ethernet.payload()))),
        },
        EtherTypes::Ipv6 => match Ipv6Packet::new(ethernet.payload()) {
            Some(ip) => {
                layers.push(
                    Layer::new("IPv6")
                        .field("version", ip.get_version())
                        .field("tc", ip.get_traffic_class())
                        .field("fl", ip.get_flow_label())
                        .field("plen", ip.get_payload_length())
                        .field("nh", protocol_name(ip.get_next_header()))
                        .field("hlim", ip.get_hop_limit())
                        .field("src", ip.get_source())
                        .field("dst", ip.get_destination()),
                );
                transport_layers(ip.get_next_header(), ipv6_transport(&ip), &mut layers);
            }
            None => layers.push(Layer::new("Raw").field("load", raw_data_to_hex(ethernet.payload()))),
        },
        EtherTypes::Arp => match ArpPacket::new(ethernet.payload()) {
            Some(arp) => layers.push(
                Layer::new("ARP")
                    .field("hwtype", format!("0x{:x}", arp.get_hardware_type().0))
                    .field("ptype", format!("0x{:04x}", arp.get_protocol_type().0))
                    .field("hwlen", arp.get_hw_addr_len())
                    .field("plen", arp.get_proto_addr_len())
                    .field("op", arp.get_operation().0)
                    .field("hwsrc", arp.get_sender_hw_addr())
                    .field("psrc", arp.get_sender_proto_addr())
                    .field("hwdst", arp.get_target_hw_addr())
                    .field("pdst", arp.get_target_proto_addr()),
            ),
            None => layers.push(Layer::new("Raw").field("load", raw_data_to_hex(ethernet.payload()))),
        },
        _ => {
            if !ethernet.payload().is_empty() {
                layers.push(Layer::new("Raw").field("load", raw_data_to_hex(ethernet.payload())));
            }
        }
    }
    layers
}

/// `###[ Layer ]###` blocks, one field per line.
pub fn show(frame: &[u8]) -> String {
    let mut out = String::new();
    for layer in decode(frame) {
        out.push_str(&format!("###[ {} ]###\n", layer.name));
        for (key, value) in &layer.fields {
            out.push_str(&format!("  {:<9} = {}\n", key, value));
        }
    }
    out
}

/// One-line summary, e.g. `Ether / IP / TCP 10.0.0.1:1234 > 10.0.0.2:80 PA`.
pub fn summary(frame: &[u8]) -> String {
    let layers = decode(frame);
    let names: Vec<&str> = layers.iter().map(|l| l.name).collect();
    let get = |layer: &str, key: &str| {
        layers
            .iter()
            .find(|l| l.name == layer)
            .and_then(|l| l.fields.iter().find(|(k, _)| *k == key))
            .map(|(_, v)| v.as_str())
    };

    let ip_layer = if names.contains(&"IP") { "IP" } else { "IPv6" };
    let endpoints = match (get(ip_layer, "src"), get(ip_layer, "dst")) {
        (Some(src), Some(dst)) => {
            let transport = ["TCP", "UDP"].into_iter().find(|t| names.contains(t));
            match transport.and_then(|t| Some((t, get(t, "sport")?, get(t, "dport")?))) {
                Some((t, sport, dport)) => {
                    let flags = if t == "TCP" {
                        get("TCP", "flags").map(|f| format!(" {}", f)).unwrap_or_default()
                    } else {
                        String::new()
                    };
                    format!(" {}:{} > {}:{}{}", src, sport, dst, dport, flags)
                }
                None => format!(" {} > {}", src, dst),
            }
        }
        _ => String::new(),
    };
    format!("{}{}", names.join(" / "), endpoints)
}
