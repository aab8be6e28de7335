use crate::domain::{XillverError, XillverResult};

const ABSENT: usize = usize::MAX;

/// Arena of equally sized spectra addressed by flattened grid index.
///
/// `slots[i]` holds the arena offset of spectrum `i`, or `ABSENT` until that
/// corner has been loaded. Spectra are appended in load order and never
/// removed.
#[derive(Debug, Clone)]
pub(crate) struct SpectrumStore {
    bins: usize,
    slots: Vec<usize>,
    arena: Vec<f32>,
    loaded: usize,
}

impl SpectrumStore {
    pub(crate) fn new(slot_count: usize, bins: usize) -> XillverResult<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(slot_count)
            .map_err(|source| XillverError::Allocation {
                requested: slot_count,
                source,
            })?;
        slots.resize(slot_count, ABSENT);

        Ok(Self {
            bins,
            slots,
            arena: Vec::new(),
            loaded: 0,
        })
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn loaded(&self) -> usize {
        self.loaded
    }

    pub(crate) fn contains(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(|offset| *offset != ABSENT)
    }

    pub(crate) fn get(&self, slot: usize) -> Option<&[f32]> {
        let offset = *self.slots.get(slot)?;
        if offset == ABSENT {
            return None;
        }
        Some(&self.arena[offset..offset + self.bins])
    }

    pub(crate) fn insert(&mut self, slot: usize, spectrum: &[f32]) -> XillverResult<()> {
        debug_assert_eq!(spectrum.len(), self.bins);
        debug_assert!(slot < self.slots.len());

        let offset = self.slots[slot];
        if offset != ABSENT {
            self.arena[offset..offset + self.bins].copy_from_slice(spectrum);
            return Ok(());
        }

        self.arena
            .try_reserve(self.bins)
            .map_err(|source| XillverError::Allocation {
                requested: self.bins,
                source,
            })?;
        self.slots[slot] = self.arena.len();
        self.arena.extend_from_slice(spectrum);
        self.loaded += 1;
        Ok(())
    }
}
