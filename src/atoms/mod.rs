// ── Readbot Atoms Layer ────────────────────────────────────────────────────
// Pure constants, types and error definitions — no I/O, no side effects.
// Dependency rule: atoms may only depend on std and external pure crates.
// Nothing here may import from engine/ or main.rs.

pub mod constants;
pub mod error;
pub mod types;
