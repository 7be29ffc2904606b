//! Secp256r1 precompile instruction layout.
//!
//! ```text
//! [count u8][padding u8]
//! count x [sig_off, sig_ix, pk_off, pk_ix, msg_off, msg_size, msg_ix] (u16 LE)
//! count x [public_key(33) signature(64) message]
//! ```

use pinocchio::pubkey::Pubkey;
use pinocchio_pubkey::pubkey;

use crate::error::KeystoreError;

/// Secp256r1 program ID
pub const SECP256R1_PROGRAM_ID: Pubkey = pubkey!("Secp256r1SigVerify1111111111111111111111111");

/// Constants from the secp256r1 program
pub const COMPRESSED_PUBKEY_SERIALIZED_SIZE: usize = 33;
pub const SIGNATURE_SERIALIZED_SIZE: usize = 64;
pub const SIGNATURE_OFFSETS_SERIALIZED_SIZE: usize = 14;
pub const SIGNATURE_OFFSETS_START: usize = 2;
pub const DATA_START: usize = SIGNATURE_OFFSETS_SERIALIZED_SIZE + SIGNATURE_OFFSETS_START;
pub const PUBKEY_DATA_OFFSET: usize = DATA_START;
pub const SIGNATURE_DATA_OFFSET: usize = DATA_START + COMPRESSED_PUBKEY_SERIALIZED_SIZE;
pub const MESSAGE_DATA_OFFSET: usize = SIGNATURE_DATA_OFFSET + SIGNATURE_SERIALIZED_SIZE;

/// Instruction index meaning "the verification instruction itself"
pub const CURRENT_INSTRUCTION: u16 = u16::MAX;

/// Secp256r1 signature offsets structure (matches solana-secp256r1-program)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Secp256r1SignatureOffsets {
    /// Offset to compact secp256r1 signature of 64 bytes
    pub signature_offset: u16,
    /// Instruction index where the signature can be found
    pub signature_instruction_index: u16,
    /// Offset to compressed public key of 33 bytes
    pub public_key_offset: u16,
    /// Instruction index where the public key can be found
    pub public_key_instruction_index: u16,
    /// Offset to the start of message data
    pub message_data_offset: u16,
    /// Size of message data in bytes
    pub message_data_size: u16,
    /// Instruction index where the message data can be found
    pub message_instruction_index: u16,
}

impl Secp256r1SignatureOffsets {
    /// Deserialize from bytes (14 bytes in little-endian format)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeystoreError> {
        if bytes.len() != SIGNATURE_OFFSETS_SERIALIZED_SIZE {
            return Err(KeystoreError::InvalidSecp256r1Instruction);
        }
        let field = |i: usize| u16::from_le_bytes([bytes[2 * i], bytes[2 * i + 1]]);

        Ok(Self {
            signature_offset: field(0),
            signature_instruction_index: field(1),
            public_key_offset: field(2),
            public_key_instruction_index: field(3),
            message_data_offset: field(4),
            message_data_size: field(5),
            message_instruction_index: field(6),
        })
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_OFFSETS_SERIALIZED_SIZE] {
        let fields = [
            self.signature_offset,
            self.signature_instruction_index,
            self.public_key_offset,
            self.public_key_instruction_index,
            self.message_data_offset,
            self.message_data_size,
            self.message_instruction_index,
        ];
        let mut out = [0u8; SIGNATURE_OFFSETS_SERIALIZED_SIZE];
        for (chunk, value) in out.chunks_exact_mut(2).zip(fields) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    fn is_self_referencing(&self) -> bool {
        self.signature_instruction_index == CURRENT_INSTRUCTION
            && self.public_key_instruction_index == CURRENT_INSTRUCTION
            && self.message_instruction_index == CURRENT_INSTRUCTION
    }
}

/// One signature to be checked by a verification instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VerificationEntry<'a> {
    pub public_key: &'a [u8],
    pub signature: &'a [u8],
    pub message: &'a [u8],
}

/// A signature read back out of verification instruction data.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SignatureView<'a> {
    pub public_key: &'a [u8; COMPRESSED_PUBKEY_SERIALIZED_SIZE],
    pub signature: &'a [u8; SIGNATURE_SERIALIZED_SIZE],
    pub message: &'a [u8],
}

/// Builds single-signature verification data: public key at 16, signature
/// at 49, message at 113.
pub fn encode_verification(
    public_key: &[u8],
    signature: &[u8],
    message: &[u8],
) -> Result<Vec<u8>, KeystoreError> {
    encode_verification_batch(&[VerificationEntry {
        public_key,
        signature,
        message,
    }])
}

/// Builds verification data checking every entry in one instruction.
pub fn encode_verification_batch(entries: &[VerificationEntry]) -> Result<Vec<u8>, KeystoreError> {
    if entries.is_empty() || entries.len() > u8::MAX as usize {
        return Err(KeystoreError::InvalidInputLength);
    }
    let header_len = SIGNATURE_OFFSETS_START + entries.len() * SIGNATURE_OFFSETS_SERIALIZED_SIZE;
    let mut total = header_len;
    for entry in entries {
        if entry.public_key.len() != COMPRESSED_PUBKEY_SERIALIZED_SIZE
            || entry.signature.len() != SIGNATURE_SERIALIZED_SIZE
        {
            return Err(KeystoreError::InvalidInputLength);
        }
        total += COMPRESSED_PUBKEY_SERIALIZED_SIZE + SIGNATURE_SERIALIZED_SIZE + entry.message.len();
    }
    if total > u16::MAX as usize {
        return Err(KeystoreError::InvalidInputLength);
    }

    let mut data = vec![0u8; header_len];
    data[0] = entries.len() as u8;
    for (i, entry) in entries.iter().enumerate() {
        let public_key_offset = data.len();
        let signature_offset = public_key_offset + COMPRESSED_PUBKEY_SERIALIZED_SIZE;
        let message_data_offset = signature_offset + SIGNATURE_SERIALIZED_SIZE;
        let offsets = Secp256r1SignatureOffsets {
            signature_offset: signature_offset as u16,
            signature_instruction_index: CURRENT_INSTRUCTION,
            public_key_offset: public_key_offset as u16,
            public_key_instruction_index: CURRENT_INSTRUCTION,
            message_data_offset: message_data_offset as u16,
            message_data_size: entry.message.len() as u16,
            message_instruction_index: CURRENT_INSTRUCTION,
        };
        let start = SIGNATURE_OFFSETS_START + i * SIGNATURE_OFFSETS_SERIALIZED_SIZE;
        data[start..start + SIGNATURE_OFFSETS_SERIALIZED_SIZE].copy_from_slice(&offsets.to_bytes());

        data.extend_from_slice(entry.public_key);
        data.extend_from_slice(entry.signature);
        data.extend_from_slice(entry.message);
    }
    Ok(data)
}

/// Reads every signature out of verification instruction data.
///
/// Only self-referencing entries are accepted; data pulled from other
/// instructions cannot be matched against an attestation.
pub fn parse_verification(data: &[u8]) -> Result<Vec<SignatureView<'_>>, KeystoreError> {
    let count = *data
        .first()
        .ok_or(KeystoreError::InvalidSecp256r1Instruction)? as usize;
    if count == 0 {
        return Err(KeystoreError::InvalidSecp256r1Instruction);
    }
    let header_len = SIGNATURE_OFFSETS_START + count * SIGNATURE_OFFSETS_SERIALIZED_SIZE;
    if data.len() < header_len {
        return Err(KeystoreError::InvalidSecp256r1Instruction);
    }

    let mut views = Vec::with_capacity(count);
    for record in data[SIGNATURE_OFFSETS_START..header_len].chunks_exact(SIGNATURE_OFFSETS_SERIALIZED_SIZE) {
        let offsets = Secp256r1SignatureOffsets::from_bytes(record)?;
        if !offsets.is_self_referencing() {
            return Err(KeystoreError::InvalidSecp256r1Instruction);
        }
        let public_key = slice_at(
            data,
            offsets.public_key_offset,
            COMPRESSED_PUBKEY_SERIALIZED_SIZE,
        )?;
        let signature = slice_at(data, offsets.signature_offset, SIGNATURE_SERIALIZED_SIZE)?;
        let message = slice_at(
            data,
            offsets.message_data_offset,
            offsets.message_data_size as usize,
        )?;
        views.push(SignatureView {
            public_key: public_key
                .try_into()
                .map_err(|_| KeystoreError::InvalidSecp256r1Instruction)?,
            signature: signature
                .try_into()
                .map_err(|_| KeystoreError::InvalidSecp256r1Instruction)?,
            message,
        });
    }
    Ok(views)
}

/// True when `data` verifies exactly one signature and it is `signature`
/// by `public_key` over `message`.
pub fn matches_verification(
    data: &[u8],
    public_key: &[u8; COMPRESSED_PUBKEY_SERIALIZED_SIZE],
    signature: &[u8; SIGNATURE_SERIALIZED_SIZE],
    message: &[u8],
) -> Result<bool, KeystoreError> {
    let views = parse_verification(data)?;
    let [view] = views.as_slice() else {
        return Err(KeystoreError::InvalidSecp256r1Instruction);
    };
    Ok(view.public_key == public_key && view.signature == signature && view.message == message)
}

fn slice_at(data: &[u8], offset: u16, len: usize) -> Result<&[u8], KeystoreError> {
    let start = offset as usize;
    data.get(start..start + len)
        .ok_or(KeystoreError::InvalidSecp256r1Instruction)
}
