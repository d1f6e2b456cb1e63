//! Neural network building blocks on `ndarray`.

pub mod activation;
pub mod embedding;
pub mod gru;
pub mod init;
pub mod layout;
pub mod linear;
pub mod lstm;

pub use activation::{sigmoid, softplus};
pub use embedding::Embedding;
pub use gru::{Gru, GruLayer, GruOutput};
pub use init::{Gate, GateBiasInit, GateLayout};
pub use layout::flatten_layers;
pub use linear::Linear;
pub use lstm::{Lstm, LstmLayer};
