use crate::frame::{
    B0_FLAG_CONTROL, B0_FLAG_FIN, B0_FLAG_RSV1, B0_FLAG_RSV2, B0_FLAG_RSV3, B0_MASK_OPCODE,
    B1_FLAG_MASK, B1_MASK_LENGTH, MAX_CONTROL_PAYLOAD, PAYLOAD_LONG, PAYLOAD_SHORT,
};
use crate::WsRole;

/// Decoded frame header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameHead {
    pub fin: bool,
    pub opcode: u8,
    pub mask: Option<[u8; 4]>,
    pub payload_len: u64,
}

impl FrameHead {
    /// Parses a frame head from the start of `buffer`, validating it against
    /// the masking rules for `role`. Returns `Incomplete` with the number of
    /// bytes required when `buffer` is too short to decide.
    pub fn parse(buffer: &[u8], role: WsRole) -> Result<FrameHead, FrameHeadParseError> {
        if buffer.len() < 2 {
            return Err(FrameHeadParseError::Incomplete(2));
        }
        let b0 = buffer[0];
        let b1 = buffer[1];

        let fin = b0 & B0_FLAG_FIN != 0;
        let opcode = b0 & B0_MASK_OPCODE;
        let is_control = b0 & B0_FLAG_CONTROL != 0;

        // Control frames cannot contain continuations.
        if is_control && !fin {
            return Err(ProtocolViolation::NonFinalControlFrame.into());
        }
        // Reserved flags are for extensions, which are not negotiated here.
        if b0 & (B0_FLAG_RSV1 | B0_FLAG_RSV2 | B0_FLAG_RSV3) != 0 {
            return Err(ProtocolViolation::ReservedFlags.into());
        }

        let masked = b1 & B1_FLAG_MASK != 0;
        if masked == role.is_client() {
            return Err(ProtocolViolation::MaskMismatch.into());
        }

        let extra_payload_len_bytes = match b1 & B1_MASK_LENGTH {
            PAYLOAD_SHORT => 2usize,
            PAYLOAD_LONG => 8usize,
            _ => 0usize,
        };
        let expected_buffer_len = 2 + extra_payload_len_bytes + (masked as usize) * 4;
        if buffer.len() < expected_buffer_len {
            return Err(FrameHeadParseError::Incomplete(expected_buffer_len));
        }

        let mut payload_len = [0u8; 8];
        match extra_payload_len_bytes {
            0 => payload_len[7] = b1 & B1_MASK_LENGTH,
            2 => payload_len[6..8].copy_from_slice(&buffer[2..4]),
            _ => payload_len.copy_from_slice(&buffer[2..10]),
        }
        let payload_len = u64::from_be_bytes(payload_len);

        if is_control && payload_len > MAX_CONTROL_PAYLOAD as u64 {
            return Err(ProtocolViolation::OversizedControlFrame.into());
        }

        let mask = match masked {
            true => {
                let mut key = [0u8; 4];
                key.copy_from_slice(&buffer[2 + extra_payload_len_bytes..expected_buffer_len]);
                Some(key)
            }
            false => None,
        };

        Ok(FrameHead {
            fin,
            opcode,
            mask,
            payload_len,
        })
    }

    pub fn is_control(&self) -> bool {
        self.opcode & B0_FLAG_CONTROL != 0
    }

    // Length of the encoded frame head in bytes ([2..14]).
    pub fn len_bytes(&self) -> usize {
        let extra_payload_len_bytes = match self.payload_len {
            0..=125 => 0usize,
            126..=65535 => 2usize,
            _ => 8usize,
        };
        2 + extra_payload_len_bytes + self.mask.is_some() as usize * 4
    }

    // Writes the frame head to the start of `buffer`. Panics if `buffer` is
    // smaller than [len_bytes()][`Self::len_bytes()`].
    pub fn encode(&self, buffer: &mut [u8]) {
        buffer[0] = (self.fin as u8 * B0_FLAG_FIN) | self.opcode;
        buffer[1] = match self.payload_len {
            0..=125 => self.payload_len as u8,
            126..=65535 => PAYLOAD_SHORT,
            _ => PAYLOAD_LONG,
        };
        match buffer[1] {
            PAYLOAD_SHORT => {
                buffer[2..4].copy_from_slice(&(self.payload_len as u16).to_be_bytes())
            }
            PAYLOAD_LONG => buffer[2..10].copy_from_slice(&self.payload_len.to_be_bytes()),
            _ => {}
        }
        if let Some(mask) = self.mask {
            let offset = match buffer[1] {
                PAYLOAD_SHORT => 4,
                PAYLOAD_LONG => 10,
                _ => 2,
            };
            buffer[offset..offset + 4].copy_from_slice(&mask);
            buffer[1] |= B1_FLAG_MASK;
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("Control frames must be final.")]
    NonFinalControlFrame,
    #[error("Reserved flags are unsupported.")]
    ReservedFlags,
    #[error("Client-sent frames must be masked. Server sent must not.")]
    MaskMismatch,
    #[error("Control frame must be less than 125B.")]
    OversizedControlFrame,
    #[error("Expected continuation opcode. Got: {0:x}")]
    ExpectedContinuation(u8),
}

#[derive(thiserror::Error, Debug)]
pub enum FrameHeadParseError {
    #[error("incomplete, need at least {0} bytes")]
    Incomplete(usize),
    #[error("{0}")]
    Protocol(#[from] ProtocolViolation),
}
