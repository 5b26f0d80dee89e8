//! FPM10 instruction codes
//!
//! Each instruction travels as the first payload byte of a command packet,
//! followed by instruction-specific arguments.

use std::fmt;

/// Instruction opcodes understood by the module
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Instruction {
    /// Detect a finger and capture its image into the image buffer
    GetImage = 0x01,

    /// Generate a character file from the image buffer into a char buffer
    Image2Tz = 0x02,

    /// Match the templates held in char buffer 1 and char buffer 2
    Match = 0x03,

    /// Search the library for the template in a char buffer
    Search = 0x04,

    /// Combine both char buffers into a model, stored back in both
    CreateModel = 0x05,

    /// Store a char buffer's template at a library slot
    Store = 0x06,

    /// Load a library slot's template into a char buffer
    LoadChar = 0x07,

    /// Stream a char buffer's template to the host
    DownloadChar = 0x08,

    /// Stream a template from the host into a char buffer
    UploadChar = 0x09,

    /// Stream the image buffer to the host
    DownloadImage = 0x0A,

    /// Stream an image from the host into the image buffer
    UploadImage = 0x0B,

    /// Delete a range of templates from the library
    DeleteChar = 0x0C,

    /// Clear the whole library
    EmptyLib = 0x0D,

    /// Read the module's status register and configuration
    ReadSysParam = 0x0F,

    /// Verify the handshake password
    VerifyPassword = 0x13,

    /// Read the number of stored templates
    TemplateCount = 0x1D,
}

impl Instruction {
    /// Wire opcode of this instruction.
    pub fn opcode(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::GetImage => "GET_IMAGE",
            Self::Image2Tz => "IMAGE_2_TZ",
            Self::Match => "MATCH",
            Self::Search => "SEARCH",
            Self::CreateModel => "CREATE_MODEL",
            Self::Store => "STORE",
            Self::LoadChar => "LOAD_CHAR",
            Self::DownloadChar => "DOWNLOAD_CHAR",
            Self::UploadChar => "UPLOAD_CHAR",
            Self::DownloadImage => "DOWNLOAD_IMAGE",
            Self::UploadImage => "UPLOAD_IMAGE",
            Self::DeleteChar => "DELETE_CHAR",
            Self::EmptyLib => "EMPTY_LIB",
            Self::ReadSysParam => "READ_SYS_PARAM",
            Self::VerifyPassword => "VERIFY_PASSWORD",
            Self::TemplateCount => "TEMPLATE_COUNT",
        }
    }
}

impl From<Instruction> for u8 {
    fn from(instruction: Instruction) -> u8 {
        instruction as u8
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// The two volatile character file buffers of the module
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CharBuffer {
    One = 0x01,
    Two = 0x02,
}

impl CharBuffer {
    /// Buffer id as sent on the wire.
    pub fn id(self) -> u8 {
        self as u8
    }
}

impl From<CharBuffer> for u8 {
    fn from(buffer: CharBuffer) -> u8 {
        buffer as u8
    }
}

impl fmt::Display for CharBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharBuffer{}", *self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcodes() {
        assert_eq!(Instruction::GetImage.opcode(), 0x01);
        assert_eq!(Instruction::ReadSysParam.opcode(), 0x0F);
        assert_eq!(Instruction::VerifyPassword.opcode(), 0x13);
        assert_eq!(Instruction::TemplateCount.opcode(), 0x1D);
    }

    #[test]
    fn test_char_buffer_ids() {
        assert_eq!(CharBuffer::One.id(), 1);
        assert_eq!(CharBuffer::Two.id(), 2);
    }
}
