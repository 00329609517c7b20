// Domain layer: EDGAR models and the ports the fetcher talks through.

pub mod model;
pub mod ports;
