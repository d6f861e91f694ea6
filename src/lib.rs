pub mod frame;
pub mod message;
pub mod reader;
pub mod writer;

/// Endpoint role. Clients mask every outbound frame and must receive
/// unmasked frames; servers mirror.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WsRole {
    Client,
    Server,
}

impl WsRole {
    pub(crate) fn is_client(self) -> bool {
        matches!(self, WsRole::Client)
    }
}
