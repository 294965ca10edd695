pub mod backpack_client;
pub mod errors;
pub mod models;
pub mod signer;
pub(crate) mod timings;
pub mod trading_helpers;
pub mod types;
pub mod volume;

pub use backpack_client::{
    BackpackClient, BackpackClientBuilder, Error as BackpackError, OrderRequest,
    Result as BackpackResult,
};
pub use signer::Credential;
pub use types::{ClientId, OrderId, Side, Symbol};
pub use volume::{LoopReport, OrderVenue, RandomizationLevel, VolumeConfig, VolumeLoop};
