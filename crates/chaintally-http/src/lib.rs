//! chaintally-http — Blockscout v2 HTTP backend for ChainTally.

mod client;

pub use client::HttpChainSource;
