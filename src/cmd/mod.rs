//! Command channel: framing codec, inbound queue, and the opcode pipeline.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Command Channel                        │
//! │                                                          │
//! │  ┌─────────┐   ┌────────┐   ┌───────────────────────┐  │
//! │  │ Queue    │──▶│ Codec  │──▶│ Pipeline (dispatcher) │  │
//! │  │ (bridge) │   │(framing)│  │  → Radio notify       │  │
//! │  └─────────┘   └────────┘   └───────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod codec;
pub mod pipeline;
pub mod queue;
