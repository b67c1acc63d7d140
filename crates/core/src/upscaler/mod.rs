//! Image upscale stage.
//!
//! [`RealCuganUpscaler`] wraps the external binary; [`UpscaleStage`] drains a
//! job's input directory into its output directory through any [`Upscaler`].

mod error;
mod realcugan;
mod stage;
mod traits;

pub use error::UpscaleError;
pub use realcugan::RealCuganUpscaler;
pub use stage::{UpscaleStage, UpscaleSummary};
pub use traits::Upscaler;
