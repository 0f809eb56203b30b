// wa-readbot — WhatsApp read-receipt bot.
//
// Layers:
//   atoms/   — constants, shared types, EngineError (no I/O)
//   engine/  — config, shared status record, WhatsApp bridge, HTTP dashboard

pub mod atoms;
pub mod engine;
