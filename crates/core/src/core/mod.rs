//! The out-of-order execution core: the Tomasulo-style structures (register
//! alias table, reservation station, reorder buffer), the functional units,
//! branch prediction, the pipeline stages built on top of them, and the
//! processor that wires a cycle together.

pub mod branch_predictor;
pub mod operation;
pub mod pipeline;
pub mod processor;
pub mod rat;
pub mod rob;
pub mod rs;
pub mod storage_bus;
pub mod units;

pub use operation::Operation;
pub use processor::Processor;
pub use rat::Rat;
pub use rob::Rob;
pub use rs::Rs;
