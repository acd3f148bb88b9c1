//! Outbound adapters: the rig-backed completion client and JSONL file I/O.

pub mod jsonl;
pub mod llm;
