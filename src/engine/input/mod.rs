// Input handling
//
// The character core never polls a device. The input collaborator delivers
// discrete `InputEvent`s, which controllers queue in an `InputBuffer` and
// consume one per fixed step.
//
// - `action`: input event definitions
// - `buffer`: bounded FIFO used to serialize pending inputs

pub mod action;
pub mod buffer;

// Re-export commonly used types
pub use action::{InputEvent, SkillSlot};
pub use buffer::InputBuffer;
