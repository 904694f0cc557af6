//! ELF note stream decoding
//!
//! A `SHT_NOTE` section or `PT_NOTE` segment is a sequence of records:
//!
//! ```text
//! +--------+--------+--------+----------------+-----+----------------+-----+
//! | namesz | descsz |  type  | name (NUL-term) | pad | desc           | pad |
//! +--------+--------+--------+----------------+-----+----------------+-----+
//!   4 bytes  4 bytes  4 bytes                  ^ aligned             ^ aligned
//! ```
//!
//! The three header words use the byte order of the containing file. Padding
//! brings the name and the descriptor up to the alignment of the section or
//! segment, counted from the start of the record.

use log::trace;
use object::elf;
use object::endian::{Endian, Endianness};
use std::io::{self, BufRead, BufReader, Read};

use crate::domain::ElfMetaError;

/// Upper bound for a declared name or descriptor size, in bytes
///
/// Corrupt size fields are rejected before anything is allocated.
pub const MAX_NOTE_SIZE: u32 = 1 << 20;

/// Note type of the GNU build-id note
pub const NT_GNU_BUILD_ID: u32 = elf::NT_GNU_BUILD_ID;

const NOTE_HEADER_SIZE: usize = 12;

/// A decoded note record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Contents of the name field, without the trailing NUL
    pub name: String,
    /// Contents of the descriptor field
    pub desc: Vec<u8>,
    /// Contents of the type field
    pub kind: u32,
}

impl Note {
    /// Check if this is a `"GNU"` note of type `NT_GNU_BUILD_ID`
    #[must_use]
    pub fn is_gnu_build_id(&self) -> bool {
        self.name.as_bytes() == elf::ELF_NOTE_GNU && self.kind == NT_GNU_BUILD_ID
    }
}

/// Power-of-two alignment for note padding. 0 and 1 both mean "no padding".
#[derive(Debug, Clone, Copy)]
struct NoteAlignment(u64);

impl NoteAlignment {
    fn new(alignment: u64) -> Result<Self, ElfMetaError> {
        match alignment {
            0 => Ok(Self(1)),
            a if a.is_power_of_two() => Ok(Self(a)),
            a => Err(ElfMetaError::InvalidNoteAlignment(a)),
        }
    }

    /// Number of bytes needed to pad `size` up to the next boundary
    fn padding(self, size: u64) -> u64 {
        let mask = self.0 - 1;
        ((size + mask) & !mask) - size
    }
}

/// Parse the notes in a `SHT_NOTE` section or `PT_NOTE` segment
///
/// The reader only needs to support sequential reads. End of stream right
/// before a record is the normal terminator, so an empty stream yields an
/// empty list.
///
/// End of stream inside the padding that follows the name is an error, but
/// inside the padding that follows the descriptor it is not: the last note of
/// a section may end without padding when the next section has a smaller
/// alignment or the section ends the file.
///
/// # Errors
/// Returns an error if a declared size exceeds [`MAX_NOTE_SIZE`], if the
/// stream ends inside a header, name, name padding or descriptor, if
/// `alignment` is not a power of two, or if the reader fails.
pub fn parse_notes<R: Read>(
    reader: R,
    alignment: u64,
    endian: Endianness,
) -> Result<Vec<Note>, ElfMetaError> {
    let alignment = NoteAlignment::new(alignment)?;
    let mut r = BufReader::new(reader);
    let mut notes = Vec::new();

    loop {
        let mut header = [0u8; NOTE_HEADER_SIZE];
        match read_full(&mut r, &mut header)? {
            0 => break,
            NOTE_HEADER_SIZE => {}
            read => return Err(ElfMetaError::TruncatedNoteHeader { read }),
        }
        let word = |i: usize| {
            endian.read_u32_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]])
        };
        let namesz = word(0);
        let descsz = word(4);
        let kind = word(8);

        if namesz > MAX_NOTE_SIZE {
            return Err(ElfMetaError::NoteNameTooLong(u64::from(namesz)));
        }

        // Sources disagree on whether namesz counts the trailing NUL, but the
        // name is always NUL-terminated. Trust the terminator.
        let mut name = String::new();
        let mut name_len = 0u64;
        if namesz > 0 {
            let (bytes, consumed) = read_name(&mut r, namesz)?;
            name = bytes;
            name_len = consumed;
        }

        let name_padding = alignment.padding(NOTE_HEADER_SIZE as u64 + name_len);
        let skipped = skip(&mut r, name_padding)?;
        if skipped < name_padding {
            return Err(ElfMetaError::MissingNamePadding(name_padding - skipped));
        }

        if descsz > MAX_NOTE_SIZE {
            return Err(ElfMetaError::NoteDescTooLong(u64::from(descsz)));
        }
        let mut desc = Vec::with_capacity(descsz as usize);
        r.by_ref().take(u64::from(descsz)).read_to_end(&mut desc)?;
        if desc.len() < descsz as usize {
            return Err(ElfMetaError::MissingNoteDesc { want: descsz, got: desc.len() });
        }

        trace!("note name={name:?} type={kind} descsz={descsz}");
        notes.push(Note { name, desc, kind });

        // Running out here just means the section ended without padding.
        skip(&mut r, alignment.padding(u64::from(descsz)))?;
    }

    Ok(notes)
}

/// Read a NUL-terminated note name
///
/// Returns the name without its terminator and the number of bytes consumed
/// from the stream, terminator included.
fn read_name<R: BufRead>(r: &mut R, namesz: u32) -> Result<(String, u64), ElfMetaError> {
    let limit = u64::from(MAX_NOTE_SIZE) + 1;
    let mut buf = Vec::new();
    r.by_ref().take(limit).read_until(0, &mut buf)?;

    if buf.last() != Some(&0) {
        if buf.len() as u64 >= limit {
            return Err(ElfMetaError::NoteNameTooLong(buf.len() as u64));
        }
        return Err(ElfMetaError::MissingNoteName(namesz));
    }

    let consumed = buf.len() as u64;
    buf.pop();
    Ok((String::from_utf8_lossy(&buf).into_owned(), consumed))
}

/// Discard up to `n` bytes, returning how many were actually available
fn skip<R: Read>(r: &mut R, n: u64) -> io::Result<u64> {
    io::copy(&mut r.by_ref().take(n), &mut io::sink())
}

/// Fill `buf` as far as the stream allows, returning the number of bytes read
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
