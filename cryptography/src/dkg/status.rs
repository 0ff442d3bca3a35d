//! Bookkeeping of which dealer gave a valid share to which share holder.

use bytes::{Buf, BufMut};
use commonware_codec::{Error as CodecError, FixedSize, Read, ReadExt, Write};
use std::collections::BTreeMap;

/// Whether a share holder considers the share it got from a dealer valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Complaint,
    Success,
}

impl Status {
    /// Returns true for [Status::Success].
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Returns the byte used to encode (and hash) the status.
    pub fn to_byte(self) -> u8 {
        match self {
            Status::Complaint => 0,
            Status::Success => 1,
        }
    }

    /// Parses a status byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Status::Complaint),
            1 => Some(Status::Success),
            _ => None,
        }
    }
}

impl Write for Status {
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.to_byte());
    }
}

impl Read for Status {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let byte = u8::read(buf)?;
        Self::from_byte(byte).ok_or(CodecError::InvalidEnum(byte))
    }
}

impl FixedSize for Status {
    const SIZE: usize = 1;
}

impl From<bool> for Status {
    fn from(success: bool) -> Self {
        if success {
            Status::Success
        } else {
            Status::Complaint
        }
    }
}

/// A dense `dealers × holders` matrix of [Status] addressed by node index.
///
/// Only indices present in the committees the matrix was created with are addressable. Accessing
/// any other index is a bookkeeping bug: it panics in debug builds and is ignored otherwise.
#[derive(Clone, Debug)]
pub struct StatusMatrix {
    dealers: BTreeMap<u32, usize>,
    holders: BTreeMap<u32, usize>,
    cells: Vec<Status>,
}

impl StatusMatrix {
    /// Creates a matrix with every cell set to `default`.
    pub fn new(
        dealers: impl IntoIterator<Item = u32>,
        holders: impl IntoIterator<Item = u32>,
        default: Status,
    ) -> Self {
        let dealers = positions(dealers);
        let holders = positions(holders);
        let cells = vec![default; dealers.len() * holders.len()];
        Self {
            dealers,
            holders,
            cells,
        }
    }

    fn cell(&self, dealer: u32, holder: u32) -> Option<usize> {
        let row = self.dealers.get(&dealer);
        let column = self.holders.get(&holder);
        debug_assert!(row.is_some(), "unknown dealer index {dealer}");
        debug_assert!(column.is_some(), "unknown holder index {holder}");
        Some(row? * self.holders.len() + column?)
    }

    /// Sets the status of the share `dealer` gave to `holder`.
    pub fn set(&mut self, dealer: u32, holder: u32, status: Status) {
        if let Some(cell) = self.cell(dealer, holder) {
            self.cells[cell] = status;
        }
    }

    /// Returns the status of the share `dealer` gave to `holder`.
    pub fn get(&self, dealer: u32, holder: u32) -> Option<Status> {
        self.cell(dealer, holder).map(|cell| self.cells[cell])
    }

    /// Sets every share of `dealer` to `status`.
    pub fn set_all(&mut self, dealer: u32, status: Status) {
        let Some(&row) = self.dealers.get(&dealer) else {
            debug_assert!(false, "unknown dealer index {dealer}");
            return;
        };
        let width = self.holders.len();
        self.cells[row * width..(row + 1) * width].fill(status);
    }

    /// Returns, for every dealer (by index), the status of its share to `holder`.
    pub fn statuses_for_share(&self, holder: u32) -> BTreeMap<u32, Status> {
        let Some(&column) = self.holders.get(&holder) else {
            debug_assert!(false, "unknown holder index {holder}");
            return BTreeMap::new();
        };
        let width = self.holders.len();
        self.dealers
            .iter()
            .map(|(&dealer, &row)| (dealer, self.cells[row * width + column]))
            .collect()
    }

    /// Returns, for every holder (by index), the status of the share `dealer` gave it.
    pub fn statuses_of_dealer(&self, dealer: u32) -> BTreeMap<u32, Status> {
        let Some(&row) = self.dealers.get(&dealer) else {
            debug_assert!(false, "unknown dealer index {dealer}");
            return BTreeMap::new();
        };
        let width = self.holders.len();
        self.holders
            .iter()
            .map(|(&holder, &column)| (holder, self.cells[row * width + column]))
            .collect()
    }

    /// Returns true if every share of `dealer` is marked [Status::Success].
    pub fn all_true(&self, dealer: u32) -> bool {
        let Some(&row) = self.dealers.get(&dealer) else {
            debug_assert!(false, "unknown dealer index {dealer}");
            return false;
        };
        let width = self.holders.len();
        self.cells[row * width..(row + 1) * width]
            .iter()
            .all(|status| status.is_success())
    }

    /// Returns true if every cell is [Status::Success].
    pub fn complete_success(&self) -> bool {
        self.cells.iter().all(|status| status.is_success())
    }

    /// Returns the number of complaints against `dealer`.
    pub fn length_complaints(&self, dealer: u32) -> usize {
        self.statuses_of_dealer(dealer)
            .values()
            .filter(|status| !status.is_success())
            .count()
    }
}

fn positions(indices: impl IntoIterator<Item = u32>) -> BTreeMap<u32, usize> {
    let mut positions = BTreeMap::new();
    for index in indices {
        let next = positions.len();
        positions.entry(index).or_insert(next);
    }
    positions
}
