//! Capture filter expressions, a subset of BPF syntax:
//!
//! * protocols: `ether`, `ip`, `ip6`, `arp`, `tcp`, `udp`, `icmp`, `icmp6`
//! * addresses: `[src|dst] host ADDR`, `[src|dst] net CIDR`, `src ADDR`, `dst ADDR`
//! * ports: `[src|dst] port N`, `[src|dst] portrange A-B`
//! * qualified forms: `tcp port 80`, `udp dst port 53`, `ip host 10.0.0.1`
//! * `and`/`&&`, `or`/`||`, `not`/`!` and parentheses
//!
//! An empty expression matches every frame.

use crate::utils::error::{ProbeError, Result};
use pnet::packet::arp::ArpPacket;
use pnet::packet::ethernet::{EtherType, EtherTypes, EthernetPacket};
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::udp::UdpPacket;
use pnet::packet::Packet;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proto {
    Ether,
    Ip,
    Ip6,
    Arp,
    Tcp,
    Udp,
    Icmp,
    Icmp6,
}

impl Proto {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "ether" => Some(Proto::Ether),
            "ip" => Some(Proto::Ip),
            "ip6" => Some(Proto::Ip6),
            "arp" => Some(Proto::Arp),
            "tcp" => Some(Proto::Tcp),
            "udp" => Some(Proto::Udp),
            "icmp" => Some(Proto::Icmp),
            "icmp6" => Some(Proto::Icmp6),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    Src,
    Dst,
    Either,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Proto(Proto),
    Host { dir: Dir, addr: IpAddr },
    Net { dir: Dir, addr: IpAddr, prefix: u8 },
    PortRange { dir: Dir, low: u16, high: u16 },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

/// A parsed capture filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    source: String,
    expr: Option<Expr>,
}

impl Filter {
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source).map_err(|message| parse_error(source, message))?;
        if tokens.is_empty() {
            return Ok(Self {
                source: source.to_string(),
                expr: None,
            });
        }

        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
        };
        let expr = parser.or_expr().map_err(|message| parse_error(source, message))?;
        if let Some(extra) = parser.peek() {
            return Err(parse_error(source, format!("unexpected '{}'", extra)));
        }

        Ok(Self {
            source: source.to_string(),
            expr: Some(expr),
        })
    }

    pub fn expr(&self) -> Option<&Expr> {
        self.expr.as_ref()
    }

    /// Whether an Ethernet frame passes the filter.
    pub fn matches(&self, frame: &[u8]) -> bool {
        let Some(expr) = &self.expr else {
            return true;
        };
        match Headers::decode(frame) {
            Some(headers) => expr.eval(&headers),
            None => false,
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_error(expr: &str, message: impl Into<String>) -> ProbeError {
    ProbeError::FilterParse {
        expr: expr.to_string(),
        message: message.into(),
    }
}

fn tokenize(source: &str) -> std::result::Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '!' => {
                tokens.push(c.to_string());
                chars.next();
            }
            '&' | '|' => {
                chars.next();
                if chars.next() != Some(c) {
                    return Err(format!("expected '{}{}'", c, c));
                }
                tokens.push(format!("{}{}", c, c));
            }
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '/' | '-') => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '/' | '-') {
                        word.push(c.to_ascii_lowercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(word);
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }
    Ok(tokens)
}

type ParseResult<T> = std::result::Result<T, String>;

struct Parser<'a> {
    tokens: &'a [String],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> Option<&str> {
        let token = self.tokens.get(self.pos).map(String::as_str);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_value(&mut self, after: &str) -> ParseResult<String> {
        match self.next() {
            Some(token) if !matches!(token, "(" | ")" | "!" | "&&" | "||") => Ok(token.to_string()),
            Some(token) => Err(format!("expected a value after '{}', found '{}'", after, token)),
            None => Err(format!("expected a value after '{}'", after)),
        }
    }

    fn or_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.and_expr()?;
        while matches!(self.peek(), Some("or" | "||")) {
            self.pos += 1;
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.unary()?;
        while matches!(self.peek(), Some("and" | "&&")) {
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if matches!(self.peek(), Some("not" | "!")) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = match self.next() {
            Some(token) => token.to_string(),
            None => return Err("unexpected end of expression".to_string()),
        };

        if token == "(" {
            let inner = self.or_expr()?;
            return match self.next() {
                Some(")") => Ok(inner),
                _ => Err("missing ')'".to_string()),
            };
        }

        if let Some(proto) = Proto::from_word(&token) {
            return self.qualified(proto);
        }

        self.primitive(&token)
    }

    /// `tcp port 80`, `ip src host 10.0.0.1`: protocol followed by a primitive.
    fn qualified(&mut self, proto: Proto) -> ParseResult<Expr> {
        let follows = matches!(
            self.peek(),
            Some("src" | "dst" | "host" | "net" | "port" | "portrange")
        );
        if !follows {
            return Ok(Expr::Proto(proto));
        }
        let token = self.next().map(str::to_string).unwrap_or_default();
        let primitive = self.primitive(&token)?;
        Ok(Expr::And(Box::new(Expr::Proto(proto)), Box::new(primitive)))
    }

    fn primitive(&mut self, token: &str) -> ParseResult<Expr> {
        let (dir, keyword) = match token {
            "src" | "dst" => {
                let dir = if token == "src" { Dir::Src } else { Dir::Dst };
                match self.peek() {
                    Some(next @ ("host" | "net" | "port" | "portrange")) => {
                        let next = next.to_string();
                        self.pos += 1;
                        (dir, next)
                    }
                    // `src 10.0.0.1` is shorthand for `src host 10.0.0.1`
                    _ => (dir, "host".to_string()),
                }
            }
            other => (Dir::Either, other.to_string()),
        };

        match keyword.as_str() {
            "host" => {
                let value = self.expect_value(&keyword)?;
                let addr = value
                    .parse::<IpAddr>()
                    .map_err(|_| format!("invalid host address '{}'", value))?;
                Ok(Expr::Host { dir, addr })
            }
            "net" => {
                let value = self.expect_value(&keyword)?;
                let (addr, prefix) = parse_cidr(&value)?;
                Ok(Expr::Net { dir, addr, prefix })
            }
            "port" => {
                let value = self.expect_value(&keyword)?;
                let port = parse_port(&value)?;
                Ok(Expr::PortRange {
                    dir,
                    low: port,
                    high: port,
                })
            }
            "portrange" => {
                let value = self.expect_value(&keyword)?;
                let (low, high) = value
                    .split_once('-')
                    .ok_or_else(|| format!("invalid port range '{}'", value))?;
                let (low, high) = (parse_port(low)?, parse_port(high)?);
                if low > high {
                    return Err(format!("invalid port range '{}'", value));
                }
                Ok(Expr::PortRange { dir, low, high })
            }
            other => Err(format!("unknown primitive '{}'", other)),
        }
    }
}

fn parse_port(value: &str) -> ParseResult<u16> {
    value
        .parse::<u16>()
        .map_err(|_| format!("invalid port '{}'", value))
}

fn parse_cidr(value: &str) -> ParseResult<(IpAddr, u8)> {
    let (addr, prefix) = match value.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (value, None),
    };
    let addr = addr
        .parse::<IpAddr>()
        .map_err(|_| format!("invalid network '{}'", value))?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    let prefix = match prefix {
        Some(p) => p
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= max)
            .ok_or_else(|| format!("invalid prefix length in '{}'", value))?,
        None => max,
    };
    Ok((addr, prefix))
}

fn in_network(addr: IpAddr, net: IpAddr, prefix: u8) -> bool {
    match (addr, net) {
        (IpAddr::V4(a), IpAddr::V4(n)) => {
            let mask = u32::MAX.checked_shl(32 - prefix as u32).unwrap_or(0);
            u32::from(a) & mask == u32::from(n) & mask
        }
        (IpAddr::V6(a), IpAddr::V6(n)) => {
            let mask = u128::MAX.checked_shl(128 - prefix as u32).unwrap_or(0);
            u128::from(a) & mask == u128::from(n) & mask
        }
        _ => false,
    }
}

/// Header fields the filter looks at, decoded once per frame.
#[derive(Debug, Default)]
struct Headers {
    ethertype: Option<EtherType>,
    protocol: Option<IpNextHeaderProtocol>,
    src_ip: Option<IpAddr>,
    dst_ip: Option<IpAddr>,
    src_port: Option<u16>,
    dst_port: Option<u16>,
}

impl Headers {
    fn decode(frame: &[u8]) -> Option<Self> {
        let ethernet = EthernetPacket::new(frame)?;
        let mut headers = Headers {
            ethertype: Some(ethernet.get_ethertype()),
            ..Default::default()
        };

        match ethernet.get_ethertype() {
            EtherTypes::Ipv4 => {
                if let Some(ip) = Ipv4Packet::new(ethernet.payload()) {
                    headers.src_ip = Some(IpAddr::V4(ip.get_source()));
                    headers.dst_ip = Some(IpAddr::V4(ip.get_destination()));
                    headers.protocol = Some(ip.get_next_level_protocol());
                    // ports live in the first fragment only
                    if ip.get_fragment_offset() == 0 {
                        headers.ports(ip.get_next_level_protocol(), ipv4_transport(&ip));
                    }
                }
            }
            EtherTypes::Ipv6 => {
                if let Some(ip) = Ipv6Packet::new(ethernet.payload()) {
                    headers.src_ip = Some(IpAddr::V6(ip.get_source()));
                    headers.dst_ip = Some(IpAddr::V6(ip.get_destination()));
                    headers.protocol = Some(ip.get_next_header());
                    headers.ports(ip.get_next_header(), ipv6_transport(&ip));
                }
            }
            EtherTypes::Arp => {
                if let Some(arp) = ArpPacket::new(ethernet.payload()) {
                    headers.src_ip = Some(IpAddr::V4(arp.get_sender_proto_addr()));
                    headers.dst_ip = Some(IpAddr::V4(arp.get_target_proto_addr()));
                }
            }
            _ => {}
        }
        Some(headers)
    }

    fn ports(&mut self, protocol: IpNextHeaderProtocol, transport: &[u8]) {
        let ports = match protocol {
            IpNextHeaderProtocols::Tcp => {
                TcpPacket::new(transport).map(|tcp| (tcp.get_source(), tcp.get_destination()))
            }
            IpNextHeaderProtocols::Udp => {
                UdpPacket::new(transport).map(|udp| (udp.get_source(), udp.get_destination()))
            }
            _ => None,
        };
        if let Some((src, dst)) = ports {
            self.src_port = Some(src);
            self.dst_port = Some(dst);
        }
    }

    fn by_dir<T: Copy>(dir: Dir, src: Option<T>, dst: Option<T>, check: impl Fn(T) -> bool) -> bool {
        match dir {
            Dir::Src => src.is_some_and(&check),
            Dir::Dst => dst.is_some_and(&check),
            Dir::Either => src.is_some_and(&check) || dst.is_some_and(&check),
        }
    }
}

/// Transport header and payload of an IPv4 packet, without Ethernet padding.
pub(crate) fn ipv4_transport<'p>(ip: &'p Ipv4Packet<'p>) -> &'p [u8] {
    let raw = ip.packet();
    let header_len = ip.get_header_length() as usize * 4;
    let total_len = (ip.get_total_length() as usize).min(raw.len());
    if header_len > total_len {
        return &[];
    }
    &raw[header_len..total_len]
}

/// Transport header and payload of an IPv6 packet; extension headers are not walked.
pub(crate) fn ipv6_transport<'p>(ip: &'p Ipv6Packet<'p>) -> &'p [u8] {
    let raw = ip.packet();
    let end = (40 + ip.get_payload_length() as usize).min(raw.len());
    raw.get(40..end).unwrap_or(&[])
}

impl Expr {
    fn eval(&self, headers: &Headers) -> bool {
        match self {
            Expr::Proto(proto) => match proto {
                Proto::Ether => true,
                Proto::Ip => headers.ethertype == Some(EtherTypes::Ipv4),
                Proto::Ip6 => headers.ethertype == Some(EtherTypes::Ipv6),
                Proto::Arp => headers.ethertype == Some(EtherTypes::Arp),
                Proto::Tcp => headers.protocol == Some(IpNextHeaderProtocols::Tcp),
                Proto::Udp => headers.protocol == Some(IpNextHeaderProtocols::Udp),
                Proto::Icmp => {
                    headers.ethertype == Some(EtherTypes::Ipv4)
                        && headers.protocol == Some(IpNextHeaderProtocols::Icmp)
                }
                Proto::Icmp6 => headers.protocol == Some(IpNextHeaderProtocols::Icmpv6),
            },
            Expr::Host { dir, addr } => {
                Headers::by_dir(*dir, headers.src_ip, headers.dst_ip, |ip| ip == *addr)
            }
            Expr::Net { dir, addr, prefix } => {
                Headers::by_dir(*dir, headers.src_ip, headers.dst_ip, |ip| {
                    in_network(ip, *addr, *prefix)
                })
            }
            Expr::PortRange { dir, low, high } => {
                Headers::by_dir(*dir, headers.src_port, headers.dst_port, |port| {
                    (*low..=*high).contains(&port)
                })
            }
            Expr::And(left, right) => left.eval(headers) && right.eval(headers),
            Expr::Or(left, right) => left.eval(headers) || right.eval(headers),
            Expr::Not(inner) => !inner.eval(headers),
        }
    }
}
