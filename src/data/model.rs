use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::{bail, Result};

// ---------------------------------------------------------------------------
// SpectralOrder – the Order column of the observation log
// ---------------------------------------------------------------------------

/// Processing level of one observation file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpectralOrder {
    /// A single echelle order, identified by its label.
    Single(String),
    /// Full merged spectrum (`"ALL"` in the log).
    Merged,
    /// Invalid row that is always excluded from queries (`"Z"` in the log).
    Excluded,
}

impl SpectralOrder {
    pub const MERGED_LABEL: &'static str = "ALL";
    pub const EXCLUDED_LABEL: &'static str = "Z";

    /// Interpret a raw Order cell.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            Self::MERGED_LABEL => SpectralOrder::Merged,
            Self::EXCLUDED_LABEL => SpectralOrder::Excluded,
            other => SpectralOrder::Single(other.to_string()),
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, SpectralOrder::Merged)
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, SpectralOrder::Excluded)
    }
}

impl fmt::Display for SpectralOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectralOrder::Single(label) => write!(f, "{label}"),
            SpectralOrder::Merged => write!(f, "{}", Self::MERGED_LABEL),
            SpectralOrder::Excluded => write!(f, "{}", Self::EXCLUDED_LABEL),
        }
    }
}

// ---------------------------------------------------------------------------
// ObservationRecord – one row of the observation log
// ---------------------------------------------------------------------------

/// A single observation file and its wavelength coverage (Å).
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub filename: String,
    pub object: String,
    pub order: SpectralOrder,
    pub wave_min: f64,
    pub wave_max: f64,
}

impl ObservationRecord {
    /// Strict coverage test: `wave_min < wave < wave_max`.
    pub fn covers(&self, wave: f64) -> bool {
        self.wave_min < wave && wave < self.wave_max
    }
}

/// The observation log, in the order the rows were loaded.
#[derive(Debug, Clone, Default)]
pub struct ObservationLog {
    records: Vec<ObservationRecord>,
}

impl ObservationLog {
    /// Build the log, rejecting rows whose wavelength interval is empty or not finite.
    pub fn new(records: Vec<ObservationRecord>) -> Result<Self> {
        for (row, rec) in records.iter().enumerate() {
            if !rec.wave_min.is_finite() || !rec.wave_max.is_finite() {
                bail!(
                    "Row {row} ({}): wavelength bounds must be finite",
                    rec.filename
                );
            }
            if rec.wave_min >= rec.wave_max {
                bail!(
                    "Row {row} ({}): WaveMin {} is not below WaveMax {}",
                    rec.filename,
                    rec.wave_min,
                    rec.wave_max
                );
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[ObservationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ParameterValue – a numeric or categorical sightline parameter
// ---------------------------------------------------------------------------

/// Value of an auxiliary stellar parameter.
///
/// Reddening is numeric, spectral type is categorical (e.g. `"B0.5 III"`).
/// Values of different kinds never compare, so any bound test against a
/// value of the other kind fails.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Number(f64),
    Text(String),
}

impl PartialOrd for ParameterValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (ParameterValue::Number(a), ParameterValue::Number(b)) => a.partial_cmp(b),
            (ParameterValue::Text(a), ParameterValue::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl ParameterValue {
    /// Parse a raw cell: numeric when it parses as a float, text otherwise.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(v) => ParameterValue::Number(v),
            Err(_) => ParameterValue::Text(trimmed.to_string()),
        }
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, ParameterValue::Number(v) if v.is_nan())
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Number(v) => write!(f, "{v}"),
            ParameterValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Number(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(s: &str) -> Self {
        ParameterValue::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// ReferenceId – provenance of a parameter measurement
// ---------------------------------------------------------------------------

/// Citation key of a parameter measurement.
///
/// Stored in normalised text form so that `1`, `"1"` and `"1.0"` are the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceId(String);

impl ReferenceId {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                ReferenceId(format!("{}", v as i64))
            }
            _ => ReferenceId(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReferenceId {
    fn from(s: &str) -> Self {
        ReferenceId::new(s)
    }
}

impl From<i64> for ReferenceId {
    fn from(v: i64) -> Self {
        ReferenceId(v.to_string())
    }
}

// ---------------------------------------------------------------------------
// Parameter tables
// ---------------------------------------------------------------------------

/// Which auxiliary parameter table a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterKind {
    /// Colour excess E(B-V).
    Reddening,
    SpectralType,
}

impl ParameterKind {
    pub const ALL: [ParameterKind; 2] = [ParameterKind::Reddening, ParameterKind::SpectralType];

    pub fn label(self) -> &'static str {
        match self {
            ParameterKind::Reddening => "E(B-V)",
            ParameterKind::SpectralType => "SpType",
        }
    }

    /// Reference ids the catalog normally uses for this parameter.
    pub fn default_references(self) -> BTreeSet<ReferenceId> {
        let ids: [i64; 2] = match self {
            ParameterKind::Reddening => [1, 2],
            ParameterKind::SpectralType => [3, 4],
        };
        ids.into_iter().map(ReferenceId::from).collect()
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One measurement of a parameter for one object from one reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRecord {
    pub object: String,
    pub value: ParameterValue,
    pub reference: ReferenceId,
    pub preferred: bool,
}

/// All measurements of one parameter, in load order.
#[derive(Debug, Clone)]
pub struct ParameterTable {
    kind: ParameterKind,
    records: Vec<ParameterRecord>,
    known_references: BTreeSet<ReferenceId>,
}

impl ParameterTable {
    pub fn new(kind: ParameterKind, records: Vec<ParameterRecord>) -> Self {
        let mut preferred_per_object: BTreeMap<&str, usize> = BTreeMap::new();
        for rec in records.iter().filter(|r| r.preferred) {
            *preferred_per_object.entry(rec.object.as_str()).or_default() += 1;
        }
        for (object, count) in preferred_per_object {
            if count > 1 {
                log::warn!("{kind} table: {count} preferred rows for object '{object}'");
            }
        }

        Self {
            kind,
            records,
            known_references: kind.default_references(),
        }
    }

    /// Replace the set of reference ids considered valid for this table.
    pub fn with_known_references(mut self, refs: impl IntoIterator<Item = ReferenceId>) -> Self {
        self.known_references = refs.into_iter().collect();
        self
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn records(&self) -> &[ParameterRecord] {
        &self.records
    }

    pub fn is_known_reference(&self, reference: &ReferenceId) -> bool {
        self.known_references.contains(reference)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Catalog – the three tables held by the oracle
// ---------------------------------------------------------------------------

/// The observation log plus the two sightline parameter tables.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub observations: ObservationLog,
    pub reddening: ParameterTable,
    pub spectral_types: ParameterTable,
}

impl Catalog {
    pub fn parameter_table(&self, kind: ParameterKind) -> &ParameterTable {
        match kind {
            ParameterKind::Reddening => &self.reddening,
            ParameterKind::SpectralType => &self.spectral_types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_labels_parse() {
        assert_eq!(SpectralOrder::parse("ALL"), SpectralOrder::Merged);
        assert_eq!(SpectralOrder::parse(" Z "), SpectralOrder::Excluded);
        assert_eq!(
            SpectralOrder::parse("O12"),
            SpectralOrder::Single("O12".to_string())
        );
    }

    #[test]
    fn mixed_kind_values_do_not_compare() {
        let n = ParameterValue::Number(0.5);
        let t = ParameterValue::from("B0.5 III");
        assert!(n.partial_cmp(&t).is_none());
        assert!(!(n > t) && !(n < t));
        assert!(ParameterValue::from("B1") > ParameterValue::from("B0.5 III"));
    }

    #[test]
    fn reference_ids_normalise_integral_floats() {
        assert_eq!(ReferenceId::new("1.0"), ReferenceId::from(1));
        assert_eq!(ReferenceId::new(" 3 "), ReferenceId::from(3));
        assert_eq!(ReferenceId::new("Wegner2003").as_str(), "Wegner2003");
        assert_ne!(ReferenceId::new("1e19"), ReferenceId::new("2e19"));
        assert_eq!(ReferenceId::new("1e19").as_str(), "1e19");
    }

    #[test]
    fn known_references_can_be_replaced() {
        let table = ParameterTable::new(ParameterKind::Reddening, Vec::new());
        assert_eq!(table.kind(), ParameterKind::Reddening);
        assert!(table.is_known_reference(&ReferenceId::from(2)));

        let table = table.with_known_references([ReferenceId::new("Fitzpatrick2007")]);
        assert!(!table.is_known_reference(&ReferenceId::from(2)));
        assert!(table.is_known_reference(&ReferenceId::new("Fitzpatrick2007")));
    }

    #[test]
    fn observation_log_rejects_inverted_interval() {
        let rec = ObservationRecord {
            filename: "bad.fits".into(),
            object: "HD 1".into(),
            order: SpectralOrder::Merged,
            wave_min: 5200.0,
            wave_max: 5000.0,
        };
        assert!(ObservationLog::new(vec![rec]).is_err());
    }
}
