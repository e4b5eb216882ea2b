//! Pipeline stages shared by the orchestrator and the assembler.
//!
//! ## Data Flow
//!
//! ```text
//! SourceFile ──▶ format::resolve ──▶ router ──▶ storage
//!                 (family, op)      (codec)    (write + verify)
//! ```
//!
//! 1. [`router`]  — map a [`crate::format::CodecOp`] onto codec calls; runs
//!    inside `spawn_blocking`
//! 2. [`layout`]  — page geometry for image pages (A4 stacks, fitted pages)
//! 3. [`storage`] — artifact naming, atomic writes, existence checks and
//!    download-name confinement

pub mod layout;
pub mod router;
pub mod storage;
