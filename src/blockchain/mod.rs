pub mod abi;
pub mod multicall;
pub mod rpc;

pub use multicall::{multicall, CallRequest, MulticallError};
pub use rpc::{AlloyChainClient, ChainClient, ChainClients, RpcError};
