pub mod codec;

pub use codec::{GenomeReader, GenomeWriter};
