use bytemuck::Pod;
use pinocchio::program_error::ProgramError;

/// Fixed-size account records that can be viewed in place over account data.
///
/// Implementors are `Pod` with alignment 1, so any byte slice of at least
/// `LEN` bytes is a valid view.
pub trait Transmutable: Pod {
    const LEN: usize;

    /// Borrows `Self` from the first `LEN` bytes of `data`.
    fn load(data: &[u8]) -> Result<&Self, ProgramError> {
        let bytes = data.get(..Self::LEN).ok_or(ProgramError::InvalidAccountData)?;
        bytemuck::try_from_bytes(bytes).map_err(|_| ProgramError::InvalidAccountData)
    }
}

/// Trait for types that can be mutably viewed over account data
pub trait TransmutableMut: Transmutable {
    fn load_mut(data: &mut [u8]) -> Result<&mut Self, ProgramError> {
        let bytes = data
            .get_mut(..Self::LEN)
            .ok_or(ProgramError::InvalidAccountData)?;
        bytemuck::try_from_bytes_mut(bytes).map_err(|_| ProgramError::InvalidAccountData)
    }
}

/// Trait for types that can be written back as raw bytes
pub trait IntoBytes {
    fn into_bytes(&self) -> &[u8];
}

impl<T: Transmutable> IntoBytes for T {
    fn into_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
