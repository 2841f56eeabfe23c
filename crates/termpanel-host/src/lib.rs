mod client;
mod manager;
mod protocol;

pub use client::RpcProcessHost;
pub use manager::HostProcessManager;
pub use protocol::{
    CreateParams, CreateResult, ExitParams, IncomingMessage, JsonRpcError, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, KillParams, OutputParams, ResizeParams, WriteParams,
};
