pub mod error;
pub mod prober;
pub mod result;

pub use error::ProbeError;
pub use prober::Prober;
pub use result::ProbeResult;
