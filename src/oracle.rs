//! The oracle: which observation files satisfy a set of criteria.
//!
//! ```text
//!   reddening table ──► filter_parameter_table ─┐
//!                                               ├─► common objects ─┐
//!   spectral types  ──► filter_parameter_table ─┘                   │
//!                                                                   ▼
//!   observation log ─────────────────────────────► object/order/wave filter ─► filenames
//! ```

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::{OracleConfig, OrderConflictPolicy};
use crate::data::filter::{
    filtered_filenames, ObjectFilter, ObservationFilter, OrderSelection, WaveWindow,
};
use crate::data::model::{
    Catalog, ObservationLog, ParameterKind, ParameterRecord, ParameterTable, ParameterValue,
    ReferenceId,
};
use crate::error::{OracleError, Result};
use crate::observe::{LogObserver, MatchCounts, QueryObserver};

// ---------------------------------------------------------------------------
// Parameter-table queries
// ---------------------------------------------------------------------------

/// Which measurements of a parameter take part in a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// Only the row flagged as preferred for each object.
    #[default]
    UsePreferred,
    /// Only rows from this reference.
    UseReference(ReferenceId),
    /// Every reference, preferred or not.
    UseAll,
}

impl ReferencePolicy {
    fn admits(&self, rec: &ParameterRecord) -> bool {
        match self {
            ReferencePolicy::UsePreferred => rec.preferred,
            ReferencePolicy::UseReference(id) => &rec.reference == id,
            ReferencePolicy::UseAll => true,
        }
    }
}

/// Value and provenance constraints on one parameter table.
///
/// Value constraints combine conjunctively; bounds are strict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterQuery {
    pub exact: Option<ParameterValue>,
    pub lower: Option<ParameterValue>,
    pub upper: Option<ParameterValue>,
    pub reference: ReferencePolicy,
}

impl ParameterQuery {
    pub fn exact(value: impl Into<ParameterValue>) -> Self {
        Self {
            exact: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn between(lower: impl Into<ParameterValue>, upper: impl Into<ParameterValue>) -> Self {
        Self {
            lower: Some(lower.into()),
            upper: Some(upper.into()),
            ..Default::default()
        }
    }

    pub fn above(lower: impl Into<ParameterValue>) -> Self {
        Self {
            lower: Some(lower.into()),
            ..Default::default()
        }
    }

    pub fn below(upper: impl Into<ParameterValue>) -> Self {
        Self {
            upper: Some(upper.into()),
            ..Default::default()
        }
    }

    pub fn with_reference(mut self, reference: ReferencePolicy) -> Self {
        self.reference = reference;
        self
    }

    fn value_matches(&self, value: &ParameterValue) -> bool {
        if let Some(exact) = &self.exact {
            if value != exact {
                return false;
            }
        }
        if let Some(lower) = &self.lower {
            if value.partial_cmp(lower) != Some(Ordering::Greater) {
                return false;
            }
        }
        if let Some(upper) = &self.upper {
            if value.partial_cmp(upper) != Some(Ordering::Less) {
                return false;
            }
        }
        true
    }

    fn validate(&self) -> Result<()> {
        let checks = [
            ("exact", &self.exact),
            ("lower", &self.lower),
            ("upper", &self.upper),
        ];
        for (parameter, value) in checks {
            if value.as_ref().is_some_and(ParameterValue::is_nan) {
                return Err(OracleError::invalid(parameter, "value is NaN"));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Observation queries
// ---------------------------------------------------------------------------

/// Full criteria for [`Oracle::filtered_observations`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationQuery {
    pub objects: ObjectFilter,
    /// Wavelength (Å) the observation must cover.
    pub wave: Option<f64>,
    pub wave_min: Option<f64>,
    pub wave_max: Option<f64>,
    pub merged_only: bool,
    pub orders_only: bool,
    pub reddening: ParameterQuery,
    pub spectral_type: ParameterQuery,
}

impl ObservationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(mut self, objects: ObjectFilter) -> Self {
        self.objects = objects;
        self
    }

    pub fn wave(mut self, wave: f64) -> Self {
        self.wave = Some(wave);
        self
    }

    pub fn wave_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.wave_min = min;
        self.wave_max = max;
        self
    }

    pub fn merged_only(mut self) -> Self {
        self.merged_only = true;
        self
    }

    pub fn orders_only(mut self) -> Self {
        self.orders_only = true;
        self
    }

    pub fn reddening(mut self, query: ParameterQuery) -> Self {
        self.reddening = query;
        self
    }

    pub fn spectral_type(mut self, query: ParameterQuery) -> Self {
        self.spectral_type = query;
        self
    }

    fn parameter(&self, kind: ParameterKind) -> &ParameterQuery {
        match kind {
            ParameterKind::Reddening => &self.reddening,
            ParameterKind::SpectralType => &self.spectral_type,
        }
    }
}

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

/// Read-only query engine over a loaded [`Catalog`].
///
/// Queries are pure functions of the catalog and their arguments, so an
/// `Oracle` can be shared between threads without locking.
pub struct Oracle {
    catalog: Arc<Catalog>,
    observer: Arc<dyn QueryObserver>,
    default_wave: f64,
    default_target: String,
    order_conflict: OrderConflictPolicy,
}

impl std::fmt::Debug for Oracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oracle")
            .field("observations", &self.catalog.observations.len())
            .field("reddening", &self.catalog.reddening.len())
            .field("spectral_types", &self.catalog.spectral_types.len())
            .field("default_wave", &self.default_wave)
            .field("default_target", &self.default_target)
            .field("order_conflict", &self.order_conflict)
            .finish()
    }
}

impl Oracle {
    /// Oracle with default settings, reporting through the `log` facade.
    pub fn new(catalog: Catalog) -> Self {
        Self::with_config(catalog, &OracleConfig::default())
    }

    pub fn with_config(catalog: Catalog, config: &OracleConfig) -> Self {
        Self {
            catalog: Arc::new(catalog),
            observer: Arc::new(LogObserver),
            default_wave: config.default_wave,
            default_target: config.default_target.clone(),
            order_conflict: config.order_conflict,
        }
    }

    /// Replace the observability collaborator.
    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn observation_log(&self) -> &ObservationLog {
        &self.catalog.observations
    }

    pub fn parameter_table(&self, kind: ParameterKind) -> &ParameterTable {
        self.catalog.parameter_table(kind)
    }

    /// `(object, value)` rows of one parameter table passing the object
    /// filter, the value constraints and the reference policy, in table order.
    ///
    /// A single-name object filter is rejected: parameter tables are only
    /// ever restricted by a list of names.
    pub fn filter_parameter_table(
        &self,
        objects: &ObjectFilter,
        kind: ParameterKind,
        query: &ParameterQuery,
    ) -> Result<Vec<(String, ParameterValue)>> {
        if let ObjectFilter::Exactly(name) = objects {
            return Err(OracleError::invalid(
                "objects",
                format!(
                    "expected no filter or a name list, got a {} ('{name}')",
                    objects.shape()
                ),
            ));
        }
        query.validate()?;

        let table = self.parameter_table(kind);
        if let ReferencePolicy::UseReference(id) = &query.reference {
            if !table.is_known_reference(id) {
                log::debug!("{kind}: reference '{id}' is not one of the table's usual references");
            }
        }

        let mut counts = MatchCounts::default();
        let mut matches = Vec::new();
        for rec in table.records() {
            let object_ok = objects.matches(&rec.object);
            let value_ok = query.value_matches(&rec.value) && query.reference.admits(rec);
            counts.object_matches += usize::from(object_ok);
            counts.value_matches += usize::from(value_ok);
            if object_ok && value_ok {
                counts.combined_matches += 1;
                matches.push((rec.object.clone(), rec.value.clone()));
            }
        }

        self.observer.parameter_matches(kind, counts);
        Ok(matches)
    }

    /// Filenames of observations whose object satisfies both parameter
    /// queries and which pass the wavelength and order-type constraints.
    ///
    /// Result order is observation-log order.
    pub fn filtered_observations(&self, query: &ObservationQuery) -> Result<Vec<String>> {
        let orders = self.resolve_orders(query.merged_only, query.orders_only)?;
        let wave = wave_window(query.wave, query.wave_min, query.wave_max)?;

        // Stage 1: each parameter table on its own.
        let mut surviving: Option<BTreeSet<String>> = None;
        for kind in ParameterKind::ALL {
            let rows = self.filter_parameter_table(&query.objects, kind, query.parameter(kind))?;
            let objects: BTreeSet<String> = rows.into_iter().map(|(object, _)| object).collect();

            // Stage 2: intersect on object name.
            surviving = Some(match surviving {
                None => objects,
                Some(prev) => prev.intersection(&objects).cloned().collect(),
            });
        }
        let common = surviving.unwrap_or_default();
        let common_list: Vec<String> = common.iter().cloned().collect();
        self.observer.common_objects(&common_list);

        // Stage 3: observation log restricted to the common objects.
        let filter = ObservationFilter {
            objects: ObjectFilter::AnyOf(common),
            orders,
            wave,
        };
        Ok(self.select(&filter))
    }

    /// Observations covering `wave` (or the configured default wavelength).
    pub fn by_wavelength(
        &self,
        wave: Option<f64>,
        merged_only: bool,
        orders_only: bool,
    ) -> Result<Vec<String>> {
        let orders = self.resolve_orders(merged_only, orders_only)?;
        let wave = wave.unwrap_or(self.default_wave);
        let filter = ObservationFilter {
            objects: ObjectFilter::NoFilter,
            orders,
            wave: wave_window(Some(wave), None, None)?,
        };
        Ok(self.select(&filter))
    }

    /// Observations of `target` (or the configured default target).
    pub fn by_target(
        &self,
        target: Option<&str>,
        merged_only: bool,
        orders_only: bool,
    ) -> Result<Vec<String>> {
        let orders = self.resolve_orders(merged_only, orders_only)?;
        let target = target.unwrap_or(&self.default_target);
        let filter = ObservationFilter {
            objects: ObjectFilter::exactly(target),
            orders,
            wave: WaveWindow::default(),
        };
        Ok(self.select(&filter))
    }

    fn select(&self, filter: &ObservationFilter) -> Vec<String> {
        let files = filtered_filenames(&self.catalog.observations, filter);
        self.observer.observations_selected(files.len());
        files
    }

    fn resolve_orders(&self, merged_only: bool, orders_only: bool) -> Result<OrderSelection> {
        if merged_only && orders_only {
            match self.order_conflict {
                OrderConflictPolicy::MergedWins => self.observer.order_conflict(),
                OrderConflictPolicy::Reject => return Err(OracleError::ConflictingOrderFlags),
            }
        }
        Ok(OrderSelection::from_flags(merged_only, orders_only))
    }
}

fn wave_window(point: Option<f64>, min: Option<f64>, max: Option<f64>) -> Result<WaveWindow> {
    for (parameter, value) in [("wave", point), ("wave_min", min), ("wave_max", max)] {
        if value.is_some_and(f64::is_nan) {
            return Err(OracleError::invalid(parameter, "wavelength is NaN"));
        }
    }
    Ok(WaveWindow { point, min, max })
}
