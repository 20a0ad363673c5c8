pub mod flow_decoder;
pub mod flow_listener;

pub use flow_decoder::{FlowDecoder, JsonFlowDecoder};
pub use flow_listener::FlowListener;
