//! Wire-level types shared by every context of the dApp bridge: the error
//! taxonomy a page can receive and the `{ requestId, result | error }`
//! response envelope posted back to it.

pub mod error;
pub mod response;

pub use error::{ErrorCode, RpcError};
pub use response::{ResponseResult, RpcResponse};
