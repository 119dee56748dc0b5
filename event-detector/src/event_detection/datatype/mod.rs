pub mod event;
pub mod kernel;
pub mod series;

pub use event::Event;
pub use kernel::{EpanechnikovKernel, GaussKernel, Kernel, RectKernel, TriangularKernel};
pub use series::SampledSeries;
