//! Fixed-layout row storage.
//!
//! Rows never cross page boundaries and every column occupies a fixed slot,
//! so a serialized row is always exactly [`ROW_SIZE`] bytes. This keeps cell
//! offsets inside a leaf node computable from the cell index alone.

use crate::errors::Error;

/// Maximum length of the username column, in bytes.
pub const USERNAME_MAX_LENGTH: usize = 32;
/// Maximum length of the email column, in bytes.
pub const EMAIL_MAX_LENGTH: usize = 255;

pub const ID_SIZE: usize = std::mem::size_of::<u32>();
/// On-disk slot for the username column: content plus a NUL terminator.
pub const USERNAME_SIZE: usize = USERNAME_MAX_LENGTH + 1;
/// On-disk slot for the email column: content plus a NUL terminator.
pub const EMAIL_SIZE: usize = EMAIL_MAX_LENGTH + 1;

pub const ID_OFFSET: usize = 0;
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// Total size of a serialized row.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// A single table record.
///
/// The string columns are stored as full fixed slots so that serializing a
/// deserialized row reproduces the on-disk bytes verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: u32,
    pub username: [u8; USERNAME_SIZE], // varchar(32)
    pub email: [u8; EMAIL_SIZE],       // varchar(255)
}

impl Row {
    /// Builds a row from parsed column values, enforcing the column length
    /// limits.
    ///
    /// # Errors
    /// Returns `Error::StringTooLong` if either string exceeds its column
    /// limit in bytes.
    pub fn new(id: u32, username: &str, email: &str) -> Result<Self, Error> {
        if username.len() > USERNAME_MAX_LENGTH || email.len() > EMAIL_MAX_LENGTH {
            return Err(Error::StringTooLong);
        }
        Ok(Row {
            id,
            username: str_to_fixed_bytes(username),
            email: str_to_fixed_bytes(email),
        })
    }

    /// Writes the row into a leaf cell's value slot.
    ///
    /// `dest` must be exactly [`ROW_SIZE`] bytes. All slot bytes are copied,
    /// including unused trailing bytes.
    pub fn serialize_into(&self, dest: &mut [u8]) -> Result<(), Error> {
        if dest.len() != ROW_SIZE {
            return Err(err!(
                Storage,
                "Row slot size mismatch (expected={}, got={})",
                ROW_SIZE,
                dest.len()
            ));
        }
        dest[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        dest[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE].copy_from_slice(&self.username);
        dest[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE].copy_from_slice(&self.email);
        Ok(())
    }

    /// Reads a row back out of a leaf cell's value slot.
    pub fn deserialize(src: &[u8]) -> Result<Self, Error> {
        if src.len() != ROW_SIZE {
            return Err(err!(
                Storage,
                "Row slot size mismatch (expected={}, got={})",
                ROW_SIZE,
                src.len()
            ));
        }
        let id = u32::from_le_bytes(
            src[ID_OFFSET..ID_OFFSET + ID_SIZE]
                .try_into()
                .map_err(|e| err!(Storage, "Failed to decode row id: {:?}", e))?,
        );
        let mut username = [0u8; USERNAME_SIZE];
        username.copy_from_slice(&src[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);
        let mut email = [0u8; EMAIL_SIZE];
        email.copy_from_slice(&src[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);
        Ok(Row {
            id,
            username,
            email,
        })
    }

    pub fn username(&self) -> String {
        fixed_bytes_to_string(&self.username)
    }

    pub fn email(&self) -> String {
        fixed_bytes_to_string(&self.email)
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username(), self.email())
    }
}

fn str_to_fixed_bytes<const N: usize>(input: &str) -> [u8; N] {
    let mut buf = [0u8; N];
    let bytes = input.as_bytes();
    let len = bytes.len().min(N);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

/// Decodes a NUL-padded column slot, stopping at the first NUL byte.
fn fixed_bytes_to_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_size() {
        assert_eq!(ROW_SIZE, 293);
        assert_eq!(EMAIL_OFFSET + EMAIL_SIZE, ROW_SIZE);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let row = Row::new(42, "alice", "alice@example.com").unwrap();
        let mut buf = vec![0u8; ROW_SIZE];
        row.serialize_into(&mut buf).unwrap();
        let decoded = Row::deserialize(&buf).unwrap();
        assert_eq!(decoded, row);
        assert_eq!(decoded.id, 42);
        assert_eq!(decoded.username(), "alice");
        assert_eq!(decoded.email(), "alice@example.com");
    }

    #[test]
    fn test_display_format() {
        let row = Row::new(1, "bob", "b@x").unwrap();
        assert_eq!(row.to_string(), "(1, bob, b@x)");
    }

    #[test]
    fn test_max_length_columns_accepted() {
        let username = "u".repeat(USERNAME_MAX_LENGTH);
        let email = "e".repeat(EMAIL_MAX_LENGTH);
        let row = Row::new(7, &username, &email).unwrap();
        assert_eq!(row.username(), username);
        assert_eq!(row.email(), email);
    }

    #[test]
    fn test_over_length_columns_rejected() {
        let username = "u".repeat(USERNAME_MAX_LENGTH + 1);
        assert!(matches!(
            Row::new(7, &username, "e@x"),
            Err(Error::StringTooLong)
        ));
        let email = "e".repeat(EMAIL_MAX_LENGTH + 1);
        assert!(matches!(
            Row::new(7, "u", &email),
            Err(Error::StringTooLong)
        ));
    }

    #[test]
    fn test_serialize_bad_slot_size() {
        let row = Row::new(1, "a", "b").unwrap();
        let mut buf = vec![0u8; ROW_SIZE - 1];
        assert!(row.serialize_into(&mut buf).is_err());
        assert!(Row::deserialize(&buf).is_err());
    }
}
