//! Confirmation codes
//!
//! The first payload byte of every acknowledge packet classifies the
//! outcome of the preceding command. A few codes are benign in specific
//! contexts (no finger during polling, no match during search); the driver
//! folds those into ordinary return values and treats the rest as errors.

use std::fmt;

/// Outcome of a command as reported by the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmationCode {
    /// Instruction executed or completed
    Ok,

    /// Error when receiving a data package
    PacketReceiveError,

    /// No finger on the sensor
    NoFinger,

    /// Failed to capture the finger image
    ImageCaptureFailed,

    /// Image too disorderly to generate a character file
    ImageTooMessy,

    /// Too few character points to generate a character file
    TooFewFeatures,

    /// The two templates do not match
    NoMatch,

    /// No matching fingerprint found in the library
    NotFound,

    /// The two scans cannot be combined into one model
    EnrollMismatch,

    /// Addressed page is beyond the fingerprint library
    BadLocation,

    /// Error when reading a template from the library
    TemplateReadError,

    /// Error when uploading a template
    TemplateUploadError,

    /// Module cannot receive the following data packages
    PacketResponseFailed,

    /// Error when uploading an image
    ImageUploadError,

    /// Failed to delete the template
    DeleteFailed,

    /// Failed to clear the fingerprint library
    ClearFailed,

    /// Incorrect password
    IncorrectPassword,

    /// No valid primary image to generate from
    InvalidImage,

    /// Error when writing to flash
    FlashWriteError,

    /// Invalid register number
    InvalidRegister,

    /// Wrong address code
    WrongAddress,

    /// The password must be verified first
    PasswordNotVerified,

    /// A code outside the documented set
    Unknown(u8),
}

impl ConfirmationCode {
    /// The raw confirmation byte.
    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::PacketReceiveError => 0x01,
            Self::NoFinger => 0x02,
            Self::ImageCaptureFailed => 0x03,
            Self::ImageTooMessy => 0x06,
            Self::TooFewFeatures => 0x07,
            Self::NoMatch => 0x08,
            Self::NotFound => 0x09,
            Self::EnrollMismatch => 0x0A,
            Self::BadLocation => 0x0B,
            Self::TemplateReadError => 0x0C,
            Self::TemplateUploadError => 0x0D,
            Self::PacketResponseFailed => 0x0E,
            Self::ImageUploadError => 0x0F,
            Self::DeleteFailed => 0x10,
            Self::ClearFailed => 0x11,
            Self::IncorrectPassword => 0x13,
            Self::InvalidImage => 0x15,
            Self::FlashWriteError => 0x18,
            Self::InvalidRegister => 0x1A,
            Self::WrongAddress => 0x20,
            Self::PasswordNotVerified => 0x21,
            Self::Unknown(code) => code,
        }
    }

    /// `true` for the success code.
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Human-readable description of the code.
    pub fn description(self) -> String {
        match self {
            Self::Ok => "instruction completed".into(),
            Self::PacketReceiveError => "error when receiving data package".into(),
            Self::NoFinger => "no finger on the sensor".into(),
            Self::ImageCaptureFailed => "failed to capture the finger image".into(),
            Self::ImageTooMessy => {
                "image too disorderly to generate a character file".into()
            }
            Self::TooFewFeatures => {
                "too few character points to generate a character file".into()
            }
            Self::NoMatch => "fingerprints do not match".into(),
            Self::NotFound => "no matching fingerprint found in the library".into(),
            Self::EnrollMismatch => "failed to combine the character files".into(),
            Self::BadLocation => "page id is beyond the fingerprint library".into(),
            Self::TemplateReadError => {
                "error when reading template from the library".into()
            }
            Self::TemplateUploadError => "error when uploading template".into(),
            Self::PacketResponseFailed => {
                "module cannot receive the following data packages".into()
            }
            Self::ImageUploadError => "error when uploading image".into(),
            Self::DeleteFailed => "failed to delete the template".into(),
            Self::ClearFailed => "failed to clear the fingerprint library".into(),
            Self::IncorrectPassword => "incorrect password".into(),
            Self::InvalidImage => "no valid primary image to generate from".into(),
            Self::FlashWriteError => "error when writing to flash".into(),
            Self::InvalidRegister => "invalid register number".into(),
            Self::WrongAddress => "wrong address code".into(),
            Self::PasswordNotVerified => "the password must be verified first".into(),
            Self::Unknown(code) => format!("unknown confirmation code 0x{code:02X}"),
        }
    }
}

impl From<u8> for ConfirmationCode {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Ok,
            0x01 => Self::PacketReceiveError,
            0x02 => Self::NoFinger,
            0x03 => Self::ImageCaptureFailed,
            0x06 => Self::ImageTooMessy,
            0x07 => Self::TooFewFeatures,
            0x08 => Self::NoMatch,
            0x09 => Self::NotFound,
            0x0A => Self::EnrollMismatch,
            0x0B => Self::BadLocation,
            0x0C => Self::TemplateReadError,
            0x0D => Self::TemplateUploadError,
            0x0E => Self::PacketResponseFailed,
            0x0F => Self::ImageUploadError,
            0x10 => Self::DeleteFailed,
            0x11 => Self::ClearFailed,
            0x13 => Self::IncorrectPassword,
            0x15 => Self::InvalidImage,
            0x18 => Self::FlashWriteError,
            0x1A => Self::InvalidRegister,
            0x20 => Self::WrongAddress,
            0x21 => Self::PasswordNotVerified,
            code => Self::Unknown(code),
        }
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for raw in 0u8..=0x21 {
            let code = ConfirmationCode::from(raw);
            assert_eq!(code.code(), raw);
        }
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(ConfirmationCode::from(0x00), ConfirmationCode::Ok);
        assert_eq!(ConfirmationCode::from(0x02), ConfirmationCode::NoFinger);
        assert_eq!(ConfirmationCode::from(0x09), ConfirmationCode::NotFound);
        assert_eq!(
            ConfirmationCode::from(0x13),
            ConfirmationCode::IncorrectPassword
        );
    }

    #[test]
    fn test_unknown_code() {
        let code = ConfirmationCode::from(0x55);
        assert_eq!(code, ConfirmationCode::Unknown(0x55));
        assert_eq!(code.code(), 0x55);
        assert!(!code.is_ok());
    }
}
