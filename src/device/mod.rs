//! Device driver collaborator contract and reading sources.
//!
//! The monitor core never talks to hardware directly: it reads the
//! [`FlowMeter`] trait, and the service loop feeds whichever
//! [`ReadingSource`] is configured into a [`DropletDriver`].

mod driver;
pub mod source;

pub use driver::{DropletDriver, FlowMeter};
pub use source::{ReadingEvent, ReadingSource, SimulatedSource, StdinSource};
