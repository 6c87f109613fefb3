//! Broadband UQ Fuzz Harness
//!
//! Property-based testing support for the UQ engine: proptest strategies for
//! model inputs, a seeded case runner with pass/fail accounting, and report
//! export.
//!
//! # Usage
//!
//! ```rust
//! use uq_fuzz::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn efficiency_is_finite(cnr in cnr_db()) {
//!         let lut = SpectralEfficiencyTable::mimo();
//!         let se = lut.spectral_efficiency(Generation::FourG, cnr).unwrap();
//!         prop_assert!(se.is_finite());
//!     }
//! }
//! ```

pub mod generators;
pub mod reports;
pub mod runner;

pub mod prelude {
    pub use crate::generators::*;
    pub use crate::runner::{FuzzConfig, FuzzResult, FuzzRunner};
    pub use broadband_uq::{Decile, Generation, SpectralEfficiencyTable};
    pub use proptest::prelude::*;
}

// Re-export proptest for convenience
pub use proptest;
