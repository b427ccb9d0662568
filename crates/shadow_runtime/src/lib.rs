// =============================================================================
// Classical Shadows Runtime - Shadow Runtime
// =============================================================================
// Table of Contents:
//   1. Module Declarations
//   2. Prelude Module
// =============================================================================
// Purpose: Randomized-measurement (classical shadow) estimation: sample-size
//          planning, basis randomization and acquisition, snapshot
//          inversion, median-of-means estimation and state reconstruction
//          behind a measurement-manager lifecycle.
// =============================================================================

pub mod acquisition;
pub mod async_acquisition;
pub mod error;
pub mod estimation;
pub mod manager;
pub mod measurement_data;
pub mod observable;
pub mod options;
pub mod sample_size;
pub mod sampling_backend;
pub mod snapshot;

pub mod prelude {
    pub use crate::acquisition::*;
    pub use crate::async_acquisition::*;
    pub use crate::error::*;
    pub use crate::estimation::*;
    pub use crate::manager::*;
    pub use crate::measurement_data::*;
    pub use crate::observable::*;
    pub use crate::options::*;
    pub use crate::sample_size::*;
    pub use crate::sampling_backend::*;
    pub use crate::snapshot::*;
}
