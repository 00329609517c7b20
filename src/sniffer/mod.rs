//! Live packet capture with a BPF-style filter.

pub mod capture;
pub mod display;
pub mod filter;
pub mod hex;

#[cfg(test)]
pub(crate) mod frames;

pub use capture::{sniff, CaptureStats, DatalinkSource, PacketSource};
pub use filter::Filter;
pub use hex::raw_data_to_hex;
