//! Hand-built Ethernet frames for unit tests.

use pnet::datalink::MacAddr;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, MutableArpPacket};
use pnet::packet::ethernet::{EtherType, EtherTypes, MutableEthernetPacket};
use pnet::packet::icmp::{IcmpTypes, MutableIcmpPacket};
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet::packet::ipv4::MutableIpv4Packet;
use pnet::packet::ipv6::MutableIpv6Packet;
use pnet::packet::tcp::MutableTcpPacket;
use pnet::packet::udp::MutableUdpPacket;
use std::net::{Ipv4Addr, Ipv6Addr};

pub const SRC_MAC: MacAddr = MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, 0x01);
pub const DST_MAC: MacAddr = MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, 0x02);

fn ethernet(ethertype: EtherType, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 14 + payload.len()];
    let mut eth = MutableEthernetPacket::new(&mut buf).unwrap();
    eth.set_source(SRC_MAC);
    eth.set_destination(DST_MAC);
    eth.set_ethertype(ethertype);
    eth.set_payload(payload);
    buf
}

fn ipv4(src: [u8; 4], dst: [u8; 4], protocol: IpNextHeaderProtocol, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 20 + payload.len()];
    let mut ip = MutableIpv4Packet::new(&mut buf).unwrap();
    ip.set_version(4);
    ip.set_header_length(5);
    ip.set_total_length((20 + payload.len()) as u16);
    ip.set_identification(0x1c46);
    ip.set_flags(2);
    ip.set_ttl(64);
    ip.set_next_level_protocol(protocol);
    ip.set_source(Ipv4Addr::from(src));
    ip.set_destination(Ipv4Addr::from(dst));
    ip.set_payload(payload);
    let checksum = pnet::packet::ipv4::checksum(&ip.to_immutable());
    ip.set_checksum(checksum);
    buf
}

fn tcp(sport: u16, dport: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 20 + payload.len()];
    let mut tcp = MutableTcpPacket::new(&mut buf).unwrap();
    tcp.set_source(sport);
    tcp.set_destination(dport);
    tcp.set_sequence(1000);
    tcp.set_acknowledgement(2000);
    tcp.set_data_offset(5);
    // PSH | ACK
    tcp.set_flags(0x18);
    tcp.set_window(64240);
    tcp.set_payload(payload);
    buf
}

fn udp(sport: u16, dport: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 8 + payload.len()];
    let mut udp = MutableUdpPacket::new(&mut buf).unwrap();
    udp.set_source(sport);
    udp.set_destination(dport);
    udp.set_length((8 + payload.len()) as u16);
    udp.set_payload(payload);
    buf
}

pub fn ipv4_tcp(src: [u8; 4], dst: [u8; 4], sport: u16, dport: u16, payload: &[u8]) -> Vec<u8> {
    let segment = tcp(sport, dport, payload);
    ethernet(
        EtherTypes::Ipv4,
        &ipv4(src, dst, IpNextHeaderProtocols::Tcp, &segment),
    )
}

pub fn ipv4_udp(src: [u8; 4], dst: [u8; 4], sport: u16, dport: u16, payload: &[u8]) -> Vec<u8> {
    let datagram = udp(sport, dport, payload);
    ethernet(
        EtherTypes::Ipv4,
        &ipv4(src, dst, IpNextHeaderProtocols::Udp, &datagram),
    )
}

pub fn ipv4_icmp(src: [u8; 4], dst: [u8; 4]) -> Vec<u8> {
    let mut buf = vec![0u8; 8];
    let mut icmp = MutableIcmpPacket::new(&mut buf).unwrap();
    icmp.set_icmp_type(IcmpTypes::EchoRequest);
    ethernet(
        EtherTypes::Ipv4,
        &ipv4(src, dst, IpNextHeaderProtocols::Icmp, &buf),
    )
}

pub fn ipv6_tcp(sport: u16, dport: u16) -> Vec<u8> {
    let segment = tcp(sport, dport, b"");
    let mut buf = vec![0u8; 40 + segment.len()];
    let mut ip = MutableIpv6Packet::new(&mut buf).unwrap();
    ip.set_version(6);
    ip.set_payload_length(segment.len() as u16);
    ip.set_next_header(IpNextHeaderProtocols::Tcp);
    ip.set_hop_limit(64);
    ip.set_source(Ipv6Addr::LOCALHOST);
    ip.set_destination(Ipv6Addr::LOCALHOST);
    ip.set_payload(&segment);
    ethernet(EtherTypes::Ipv6, &buf)
}

pub fn arp_request(sender: [u8; 4], target: [u8; 4]) -> Vec<u8> {
    let mut buf = vec![0u8; 28];
    let mut arp = MutableArpPacket::new(&mut buf).unwrap();
    arp.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp.set_protocol_type(EtherTypes::Ipv4);
    arp.set_hw_addr_len(6);
    arp.set_proto_addr_len(4);
    arp.set_operation(ArpOperations::Request);
    arp.set_sender_hw_addr(SRC_MAC);
    arp.set_sender_proto_addr(Ipv4Addr::from(sender));
    arp.set_target_hw_addr(MacAddr::zero());
    arp.set_target_proto_addr(Ipv4Addr::from(target));
    ethernet(EtherTypes::Arp, &buf)
}
