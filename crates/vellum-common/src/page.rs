//! Page buffer and on-page header layout for VellumDB storage.

/// Page size in bytes (8 KiB).
pub const PAGE_SIZE: usize = 8 * 1024;

/// Size of the on-page header in bytes.
pub const PAGE_HEADER_SIZE: usize = 32;

// Header field offsets.
const OFF_PAGE_ID: usize = 0;
const OFF_POSITION_ID: usize = 4;
const OFF_RECOVERY_POSITION_ID: usize = 8;
const OFF_TRANSACTION_ID: usize = 12;
const OFF_PAGE_TYPE: usize = 16;
const OFF_FLAGS: usize = 17;
const OFF_CHECKSUM: usize = 20;

// Flag bits.
const FLAG_CONFIRMED: u8 = 0b0000_0001;
const FLAG_DIRTY: u8 = 0b0000_0010;

/// Page types in VellumDB storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageType {
    /// Unallocated/cleared page.
    Empty = 0,
    /// Database file header page.
    Header = 1,
    /// Allocation map page at an AM group boundary.
    AllocationMap = 2,
    /// Document data page.
    Data = 3,
    /// Index page.
    Index = 4,
}

impl PageType {
    /// Decodes a page type byte. Unknown values decode as `Empty`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::Header,
            2 => PageType::AllocationMap,
            3 => PageType::Data,
            4 => PageType::Index,
            _ => PageType::Empty,
        }
    }
}

/// A fixed-size page buffer with typed access to the on-page header.
///
/// Header layout (32 bytes):
/// - page_id: 4 bytes (logical identity, home slot in the data region)
/// - position_id: 4 bytes (physical slot currently occupied)
/// - recovery_position_id: 4 bytes (slot recorded for crash recovery)
/// - transaction_id: 4 bytes
/// - page_type: 1 byte
/// - flags: 1 byte (confirmed, dirty)
/// - reserved: 2 bytes
/// - checksum: 4 bytes (CRC32 of the page with this field zeroed)
/// - reserved: 8 bytes
pub struct PageBuffer {
    data: Box<[u8; PAGE_SIZE]>,
}

impl PageBuffer {
    /// Creates a new zeroed page buffer.
    pub fn new() -> Self {
        Self {
            data: Box::new([0u8; PAGE_SIZE]),
        }
    }

    /// Zeroes the entire buffer, header included.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    #[inline]
    fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    #[inline]
    fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Returns the logical page ID.
    #[inline]
    pub fn page_id(&self) -> u32 {
        self.read_u32(OFF_PAGE_ID)
    }

    /// Sets the logical page ID.
    #[inline]
    pub fn set_page_id(&mut self, page_id: u32) {
        self.write_u32(OFF_PAGE_ID, page_id);
    }

    /// Returns the physical slot this page currently occupies.
    #[inline]
    pub fn position_id(&self) -> u32 {
        self.read_u32(OFF_POSITION_ID)
    }

    /// Sets the physical slot.
    #[inline]
    pub fn set_position_id(&mut self, position_id: u32) {
        self.write_u32(OFF_POSITION_ID, position_id);
    }

    /// Returns the slot recorded for crash recovery.
    #[inline]
    pub fn recovery_position_id(&self) -> u32 {
        self.read_u32(OFF_RECOVERY_POSITION_ID)
    }

    /// Sets the recovery slot.
    #[inline]
    pub fn set_recovery_position_id(&mut self, position_id: u32) {
        self.write_u32(OFF_RECOVERY_POSITION_ID, position_id);
    }

    /// Returns the owning transaction ID.
    #[inline]
    pub fn transaction_id(&self) -> u32 {
        self.read_u32(OFF_TRANSACTION_ID)
    }

    /// Sets the owning transaction ID.
    #[inline]
    pub fn set_transaction_id(&mut self, transaction_id: u32) {
        self.write_u32(OFF_TRANSACTION_ID, transaction_id);
    }

    /// Returns the page type.
    #[inline]
    pub fn page_type(&self) -> PageType {
        PageType::from_u8(self.data[OFF_PAGE_TYPE])
    }

    /// Sets the page type.
    #[inline]
    pub fn set_page_type(&mut self, page_type: PageType) {
        self.data[OFF_PAGE_TYPE] = page_type as u8;
    }

    /// True on the last page of a committed transaction batch.
    #[inline]
    pub fn is_confirmed(&self) -> bool {
        self.data[OFF_FLAGS] & FLAG_CONFIRMED != 0
    }

    /// Sets the confirmed flag.
    #[inline]
    pub fn set_confirmed(&mut self, confirmed: bool) {
        if confirmed {
            self.data[OFF_FLAGS] |= FLAG_CONFIRMED;
        } else {
            self.data[OFF_FLAGS] &= !FLAG_CONFIRMED;
        }
    }

    /// True when the in-memory buffer differs from disk.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.data[OFF_FLAGS] & FLAG_DIRTY != 0
    }

    /// Sets the dirty flag.
    #[inline]
    pub fn set_dirty(&mut self, dirty: bool) {
        if dirty {
            self.data[OFF_FLAGS] |= FLAG_DIRTY;
        } else {
            self.data[OFF_FLAGS] &= !FLAG_DIRTY;
        }
    }

    /// Returns the stored checksum (0 = not checksummed).
    #[inline]
    pub fn checksum(&self) -> u32 {
        self.read_u32(OFF_CHECKSUM)
    }

    /// Computes the CRC32 of the page with the checksum field zeroed.
    pub fn compute_checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.data[..OFF_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&self.data[OFF_CHECKSUM + 4..]);
        hasher.finalize()
    }

    /// Stamps the checksum field with the current page contents.
    pub fn update_checksum(&mut self) {
        let checksum = self.compute_checksum();
        self.write_u32(OFF_CHECKSUM, checksum);
    }

    /// Validates the stored checksum.
    ///
    /// A stored checksum of 0 means the page was never stamped (for
    /// example a freshly zeroed slot) and passes validation.
    pub fn verify_checksum(&self) -> bool {
        let stored = self.checksum();
        stored == 0 || stored == self.compute_checksum()
    }

    /// Returns the full page bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    /// Returns the full page bytes mutably.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    /// Returns the page content area past the header.
    #[inline]
    pub fn content(&self) -> &[u8] {
        &self.data[PAGE_HEADER_SIZE..]
    }

    /// Returns the page content area past the header, mutably.
    #[inline]
    pub fn content_mut(&mut self) -> &mut [u8] {
        &mut self.data[PAGE_HEADER_SIZE..]
    }
}

impl Default for PageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBuffer")
            .field("page_id", &self.page_id())
            .field("position_id", &self.position_id())
            .field("recovery_position_id", &self.recovery_position_id())
            .field("transaction_id", &self.transaction_id())
            .field("page_type", &self.page_type())
            .field("is_confirmed", &self.is_confirmed())
            .field("is_dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_constants() {
        assert_eq!(PAGE_SIZE, 8192);
        assert_eq!(PAGE_HEADER_SIZE, 32);
    }

    #[test]
    fn test_new_page_is_zeroed() {
        let page = PageBuffer::new();
        assert_eq!(page.page_id(), 0);
        assert_eq!(page.position_id(), 0);
        assert_eq!(page.recovery_position_id(), 0);
        assert_eq!(page.transaction_id(), 0);
        assert_eq!(page.page_type(), PageType::Empty);
        assert!(!page.is_confirmed());
        assert!(!page.is_dirty());
        assert_eq!(page.checksum(), 0);
    }

    #[test]
    fn test_header_field_roundtrip() {
        let mut page = PageBuffer::new();
        page.set_page_id(42);
        page.set_position_id(9001);
        page.set_recovery_position_id(9001);
        page.set_transaction_id(7);
        page.set_page_type(PageType::Data);

        assert_eq!(page.page_id(), 42);
        assert_eq!(page.position_id(), 9001);
        assert_eq!(page.recovery_position_id(), 9001);
        assert_eq!(page.transaction_id(), 7);
        assert_eq!(page.page_type(), PageType::Data);
    }

    #[test]
    fn test_flags_independent() {
        let mut page = PageBuffer::new();

        page.set_confirmed(true);
        assert!(page.is_confirmed());
        assert!(!page.is_dirty());

        page.set_dirty(true);
        assert!(page.is_confirmed());
        assert!(page.is_dirty());

        page.set_confirmed(false);
        assert!(!page.is_confirmed());
        assert!(page.is_dirty());
    }

    #[test]
    fn test_page_type_fallback() {
        assert_eq!(PageType::from_u8(0), PageType::Empty);
        assert_eq!(PageType::from_u8(3), PageType::Data);
        assert_eq!(PageType::from_u8(200), PageType::Empty);
    }

    #[test]
    fn test_reset() {
        let mut page = PageBuffer::new();
        page.set_page_id(5);
        page.set_dirty(true);
        page.content_mut()[0] = 0xAB;

        page.reset();

        assert_eq!(page.page_id(), 0);
        assert!(!page.is_dirty());
        assert_eq!(page.content()[0], 0);
    }

    #[test]
    fn test_checksum_roundtrip() {
        let mut page = PageBuffer::new();
        page.set_page_id(3);
        page.content_mut()[10] = 0xCD;
        page.update_checksum();

        assert_ne!(page.checksum(), 0);
        assert!(page.verify_checksum());
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut page = PageBuffer::new();
        page.set_page_id(3);
        page.content_mut()[10] = 0xCD;
        page.update_checksum();

        page.content_mut()[10] = 0xCE;
        assert!(!page.verify_checksum());
    }

    #[test]
    fn test_unstamped_page_passes_verification() {
        let page = PageBuffer::new();
        assert!(page.verify_checksum());
    }

    #[test]
    fn test_checksum_excludes_itself() {
        let mut page = PageBuffer::new();
        page.set_page_id(9);
        let before = page.compute_checksum();
        page.update_checksum();
        assert_eq!(page.compute_checksum(), before);
    }

    #[test]
    fn test_content_area() {
        let mut page = PageBuffer::new();
        page.content_mut().fill(0x11);

        // Header untouched by content writes
        assert_eq!(page.page_id(), 0);
        assert_eq!(page.content().len(), PAGE_SIZE - PAGE_HEADER_SIZE);
        assert_eq!(page.as_bytes()[PAGE_HEADER_SIZE], 0x11);
    }
}
