/// The file prefix. Unlike format version 2, which carried dimensions and
/// scale factor up front, version 3 keeps the header down to magic bytes and
/// a version number; all metadata lives in the trailer.
pub struct OmHeader;

impl OmHeader {
    pub const MAGIC_NUMBER1: u8 = 79;
    pub const MAGIC_NUMBER2: u8 = 77;
    pub const VERSION: u8 = 3;
    pub const LENGTH: usize = 3;

    pub fn as_bytes() -> [u8; Self::LENGTH] {
        [Self::MAGIC_NUMBER1, Self::MAGIC_NUMBER2, Self::VERSION]
    }
}
