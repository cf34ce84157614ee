use crate::{Cancelled, TextRange, TextSlice, TextView};
use std::{
    cell::{Cell, RefCell},
    fmt,
    ops::{Bound, RangeBounds},
    rc::Rc,
};

/// How many accesses a [`CancellableSequence`] allows between two polls of its predicate.
pub const CHECK_INTERVAL: usize = 1024;

/// Random access to a sequence of UTF-16 code units.
pub trait CharSequence {
    fn len(&self) -> usize;

    fn code_unit_at(&self, index: usize) -> u16;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CharSequence for [u16] {
    fn len(&self) -> usize {
        <[u16]>::len(self)
    }

    fn code_unit_at(&self, index: usize) -> u16 {
        self[index]
    }
}

impl<V: TextView + ?Sized> CharSequence for TextSlice<'_, V> {
    fn len(&self) -> usize {
        TextSlice::len(self)
    }

    fn code_unit_at(&self, index: usize) -> u16 {
        TextSlice::code_unit_at(self, index)
    }
}

struct State<F> {
    accesses: Cell<usize>,
    is_active: RefCell<F>,
}

/// Wraps a [`CharSequence`] so that a long scan over it can be stopped from the outside.
///
/// Every length query, code unit access or call to [`CancellableSequence::sub_sequence`]
/// counts as one access. On every [`CHECK_INTERVAL`]th access the `is_active` predicate
/// is polled, and once it returns `false` that access fails with [`Cancelled`]. Sequences
/// derived through `sub_sequence` share the counter and the predicate with their parent.
///
/// The wrapper is not `Send`. It must only be driven by the task that owns the
/// cancellation it observes.
pub struct CancellableSequence<'a, S: ?Sized, F> {
    sequence: &'a S,
    range: TextRange,
    state: Rc<State<F>>,
}

impl<'a, S, F> CancellableSequence<'a, S, F>
where
    S: CharSequence + ?Sized,
    F: FnMut() -> bool,
{
    pub fn new(sequence: &'a S, is_active: F) -> Self {
        Self {
            range: 0..sequence.len(),
            sequence,
            state: Rc::new(State {
                accesses: Cell::new(0),
                is_active: RefCell::new(is_active),
            }),
        }
    }

    /// Total number of accesses made through this sequence and every sequence derived
    /// from it.
    pub fn access_count(&self) -> usize {
        self.state.accesses.get()
    }

    fn record_access(&self) -> Result<(), Cancelled> {
        let accesses = self.state.accesses.get() + 1;
        self.state.accesses.set(accesses);
        if accesses % CHECK_INTERVAL == 0 {
            let is_active = (self.state.is_active.borrow_mut())();
            log::trace!("polled cancellation after {accesses} accesses: active = {is_active}");
            if !is_active {
                return Err(Cancelled);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> Result<usize, Cancelled> {
        self.record_access()?;
        Ok(self.range.len())
    }

    pub fn is_empty(&self) -> Result<bool, Cancelled> {
        Ok(self.len()? == 0)
    }

    #[track_caller]
    pub fn code_unit_at(&self, index: usize) -> Result<u16, Cancelled> {
        self.record_access()?;
        assert!(
            index < self.range.len(),
            "index {index} is out of range for a sequence of length {}",
            self.range.len()
        );
        Ok(self.sequence.code_unit_at(self.range.start + index))
    }

    /// A sequence over `range` of this one that shares its cancellation state.
    #[track_caller]
    pub fn sub_sequence(&self, range: impl RangeBounds<usize>) -> Result<Self, Cancelled> {
        self.record_access()?;
        let len = self.range.len();
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end + 1,
            Bound::Excluded(&end) => end,
            Bound::Unbounded => len,
        };
        assert!(
            start <= end && end <= len,
            "range {start}..{end} is out of range for a sequence of length {len}"
        );
        Ok(Self {
            sequence: self.sequence,
            range: self.range.start + start..self.range.start + end,
            state: self.state.clone(),
        })
    }

    /// Finds the first occurrence of `needle`, returning its index.
    pub fn find(&self, needle: &[u16]) -> Result<Option<usize>, Cancelled> {
        let len = self.len()?;
        if needle.len() > len {
            return Ok(None);
        }

        'candidates: for start in 0..=len - needle.len() {
            for (index, unit) in needle.iter().enumerate() {
                if self.code_unit_at(start + index)? != *unit {
                    continue 'candidates;
                }
            }
            return Ok(Some(start));
        }
        Ok(None)
    }

    pub fn find_str(&self, needle: &str) -> Result<Option<usize>, Cancelled> {
        let needle = needle.encode_utf16().collect::<Vec<_>>();
        self.find(&needle)
    }

    /// Decodes the whole sequence, replacing unpaired surrogates with U+FFFD.
    pub fn to_string_lossy(&self) -> Result<String, Cancelled> {
        let mut result = Ok(());
        let units = (0..self.range.len()).map_while(|index| match self.code_unit_at(index) {
            Ok(unit) => Some(unit),
            Err(error) => {
                result = Err(error);
                None
            }
        });
        let text = char::decode_utf16(units)
            .map(|ch| ch.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect::<String>();
        result.map(|()| text)
    }
}

impl<S: ?Sized, F> fmt::Debug for CancellableSequence<'_, S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellableSequence")
            .field("range", &self.range)
            .field("accesses", &self.state.accesses.get())
            .finish_non_exhaustive()
    }
}
