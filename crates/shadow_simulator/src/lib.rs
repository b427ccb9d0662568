// =============================================================================
// Classical Shadows Runtime - Shadow Simulator
// =============================================================================
// Table of Contents:
//   1. Module Declarations
//   2. Prelude Module
// =============================================================================
// Purpose: Dense state-vector reference backend for the classical shadow
//          runtime: gate set, parameterized preparation circuits and a
//          seeded randomized-basis sampler.
// =============================================================================

pub mod circuit_program;
pub mod error;
pub mod gate_operations;
pub mod sampling;
pub mod state_backend;

pub mod prelude {
    pub use crate::circuit_program::*;
    pub use crate::error::*;
    pub use crate::gate_operations::*;
    pub use crate::sampling::*;
    pub use crate::state_backend::*;
}
