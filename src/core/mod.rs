pub mod fetcher;
pub mod step;

pub use crate::domain::model::{StepOutcome, StepReport};
pub use crate::domain::ports::{ConfigProvider, FilingsSource, Storage};
pub use crate::utils::error::Result;
