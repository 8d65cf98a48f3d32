//! Quiz state — round engine, scoring, mastery, study browsing, and the
//! session that owns them. State lives in WASM memory (thread_local) for the
//! lifetime of the Web Worker and is mirrored to `localStorage` on every
//! mutation.

pub mod answers;
pub mod mastery;
pub mod round;
pub mod sampler;
pub mod score;
pub mod state;
pub mod study;
pub mod timer;
