//! Earth-orientation parameters.
//!
//! Frame transformations that touch the Earth-fixed frame need polar motion,
//! length-of-day, and the celestial-pole corrections at the epoch of
//! interest. Those values come from an [`EopProvider`]; file ingestion is a
//! caller concern. A process-wide provider can be installed once at startup
//! and is then read from any thread; swapping it later (hot reload) is
//! serialized behind a lock.

use std::sync::{Arc, OnceLock, RwLock};

use crate::time::Epoch;

/// Earth-orientation parameters at one epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EopRecord {
    /// Polar motion x, radians.
    pub xp: f64,
    /// Polar motion y, radians.
    pub yp: f64,
    /// Excess length of day, seconds.
    pub lod: f64,
    /// Nutation correction in longitude, radians.
    pub dpsi: f64,
    /// Nutation correction in obliquity, radians.
    pub deps: f64,
}

/// Source of Earth-orientation parameters.
pub trait EopProvider: Send + Sync {
    /// Parameters at the given UTC epoch.
    ///
    /// Implementations must answer for any epoch; out-of-table queries fall
    /// back to the nearest tabulated endpoint.
    fn eop_at(&self, epoch: &Epoch) -> EopRecord;
}

/// A provider returning one constant record, regardless of epoch.
///
/// The zero record gives the "no EOP" approximation: GCRF collapses onto
/// J2000 and polar motion vanishes, which is adequate at the tens-of-metres
/// level.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedEop {
    record: EopRecord,
}

impl FixedEop {
    /// Provider holding the given record.
    #[must_use]
    pub const fn new(record: EopRecord) -> Self {
        Self { record }
    }

    /// Provider holding the zero record.
    #[must_use]
    pub const fn zero() -> Self {
        Self { record: EopRecord { xp: 0.0, yp: 0.0, lod: 0.0, dpsi: 0.0, deps: 0.0 } }
    }
}

impl EopProvider for FixedEop {
    fn eop_at(&self, _epoch: &Epoch) -> EopRecord {
        self.record
    }
}

/// A provider backed by an in-memory table, linearly interpolated.
///
/// Records must be supplied sorted by epoch. Queries before the first or
/// after the last record clamp to that endpoint.
#[derive(Clone, Debug)]
pub struct TabulatedEop {
    records: Vec<(Epoch, EopRecord)>,
}

impl TabulatedEop {
    /// Build a provider from epoch-sorted records.
    ///
    /// # Panics
    ///
    /// Panics when `records` is empty.
    #[must_use]
    pub fn new(records: Vec<(Epoch, EopRecord)>) -> Self {
        assert!(!records.is_empty(), "EOP table must contain at least one record");
        Self { records }
    }
}

impl EopProvider for TabulatedEop {
    fn eop_at(&self, epoch: &Epoch) -> EopRecord {
        let first = &self.records[0];
        let last = &self.records[self.records.len() - 1];
        if *epoch <= first.0 {
            return first.1;
        }
        if *epoch >= last.0 {
            return last.1;
        }
        let index = self
            .records
            .partition_point(|(e, _)| *e <= *epoch)
            .saturating_sub(1);
        let (e0, r0) = &self.records[index];
        let (e1, r1) = &self.records[index + 1];
        let span = e1.difference(e0);
        let t = if span > 0.0 { epoch.difference(e0) / span } else { 0.0 };
        let blend = |a: f64, b: f64| a + (b - a) * t;
        EopRecord {
            xp: blend(r0.xp, r1.xp),
            yp: blend(r0.yp, r1.yp),
            lod: blend(r0.lod, r1.lod),
            dpsi: blend(r0.dpsi, r1.dpsi),
            deps: blend(r0.deps, r1.deps),
        }
    }
}

static GLOBAL_PROVIDER: OnceLock<RwLock<Arc<dyn EopProvider>>> = OnceLock::new();

fn provider_cell() -> &'static RwLock<Arc<dyn EopProvider>> {
    GLOBAL_PROVIDER.get_or_init(|| RwLock::new(Arc::new(FixedEop::zero())))
}

/// Install the process-wide EOP provider.
///
/// Call once at startup, before the first frame transformation; calling
/// again replaces the provider for all subsequent queries (hot reload).
pub fn install_provider(provider: Arc<dyn EopProvider>) {
    *provider_cell().write().expect("EOP provider lock poisoned") = provider;
}

/// The currently installed provider ([`FixedEop::zero`] until one is
/// installed).
#[must_use]
pub fn provider() -> Arc<dyn EopProvider> {
    provider_cell().read().expect("EOP provider lock poisoned").clone()
}
