//! Weighted event catalog and selection.
//!
//! The catalog is scanned in a stable order: a uniform draw in `[0,
//! total_weight)` selects the first definition whose cumulative weight exceeds
//! the draw. Over many draws each definition appears with frequency `weight /
//! total_weight`.

use std::collections::{BTreeMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, EventKind, Severity};

/// A named event kind with its severity and relative selection weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventDefinition {
    /// Wire name of the event, e.g. `DATA_WRITE`
    pub name: String,
    /// Severity every instance of this event is logged at
    pub severity: Severity,
    /// Relative probability of selection, need not sum to one
    pub weight: f64,
}

impl EventDefinition {
    /// Build a definition for a known kind with its built-in severity and
    /// weight.
    #[must_use]
    pub fn builtin(kind: EventKind) -> Self {
        Self {
            name: kind.as_str().to_string(),
            severity: kind.default_severity(),
            weight: kind.default_weight(),
        }
    }
}

/// The outcome of a weighted draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pick<'a> {
    /// The draw landed inside a definition's cumulative weight
    Matched(&'a EventDefinition),
    /// Rounding left the draw unmatched, the designated fallback was used
    Fallback(&'a EventDefinition),
}

impl<'a> Pick<'a> {
    /// The chosen definition, however it was chosen.
    #[must_use]
    pub fn definition(self) -> &'a EventDefinition {
        match self {
            Pick::Matched(def) | Pick::Fallback(def) => def,
        }
    }

    /// Whether the fallback path produced this pick.
    #[must_use]
    pub fn is_fallback(self) -> bool {
        matches!(self, Pick::Fallback(_))
    }
}

/// A validated, non-empty set of event definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    definitions: Vec<EventDefinition>,
    total_weight: f64,
}

impl Catalog {
    /// Create a new catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if `definitions` is empty, if any weight is not a
    /// finite positive number, if the total weight overflows or if two
    /// definitions share a name.
    pub fn new(definitions: Vec<EventDefinition>) -> Result<Self, Error> {
        if definitions.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        let mut seen = HashSet::with_capacity(definitions.len());
        for def in &definitions {
            if !(def.weight.is_finite() && def.weight > 0.0) {
                return Err(Error::InvalidWeight {
                    name: def.name.clone(),
                    weight: def.weight,
                });
            }
            if !seen.insert(def.name.as_str()) {
                return Err(Error::DuplicateEvent(def.name.clone()));
            }
        }
        let total_weight: f64 = definitions.iter().map(|def| def.weight).sum();
        if !total_weight.is_finite() {
            return Err(Error::WeightOverflow);
        }
        Ok(Self {
            definitions,
            total_weight,
        })
    }

    /// Replace the weight of named definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if an override names an event not in the catalog or
    /// the new weights fail the checks of [`Catalog::new`]. The catalog is
    /// left unchanged on error.
    pub fn reweighted(&self, overrides: &BTreeMap<String, f64>) -> Result<Self, Error> {
        let mut definitions = self.definitions.clone();
        for (name, weight) in overrides {
            let def = definitions
                .iter_mut()
                .find(|def| &def.name == name)
                .ok_or_else(|| Error::UnknownOverride(name.clone()))?;
            def.weight = *weight;
        }
        Self::new(definitions)
    }

    /// Definitions in scan order.
    #[must_use]
    pub fn definitions(&self) -> &[EventDefinition] {
        &self.definitions
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Find a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EventDefinition> {
        self.definitions.iter().find(|def| def.name == name)
    }

    /// The definition returned when a draw escapes the scan, the last in
    /// catalog order.
    #[must_use]
    pub fn fallback(&self) -> &EventDefinition {
        // `new` refuses an empty catalog
        &self.definitions[self.definitions.len() - 1]
    }

    /// Resolve a draw from `[0, total_weight)` to a definition.
    #[must_use]
    pub fn pick(&self, draw: f64) -> Pick<'_> {
        let mut cumulative = 0.0;
        for def in &self.definitions {
            cumulative += def.weight;
            if draw < cumulative {
                return Pick::Matched(def);
            }
        }
        Pick::Fallback(self.fallback())
    }

    /// Draw one definition with probability proportional to its weight.
    pub fn select<R>(&self, rng: &mut R) -> Pick<'_>
    where
        R: Rng + ?Sized,
    {
        let draw = rng.random_range(0.0..self.total_weight);
        self.pick(draw)
    }
}

impl Default for Catalog {
    /// The built-in catalog, one definition per [`EventKind`].
    fn default() -> Self {
        let definitions: Vec<EventDefinition> = EventKind::ALL
            .iter()
            .copied()
            .map(EventDefinition::builtin)
            .collect();
        let total_weight = definitions.iter().map(|def| def.weight).sum();
        Self {
            definitions,
            total_weight,
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};
    use rustc_hash::FxHashMap;

    use super::{Catalog, EventDefinition, Pick};
    use crate::{Error, EventKind, Severity};

    fn def(name: &str, severity: Severity, weight: f64) -> EventDefinition {
        EventDefinition {
            name: name.to_string(),
            severity,
            weight,
        }
    }

    #[test]
    fn builtin_catalog_passes_validation() {
        let catalog = Catalog::default();
        let rebuilt = Catalog::new(catalog.definitions().to_vec()).expect("builtin catalog invalid");
        assert_eq!(rebuilt, catalog);
        assert_eq!(catalog.definitions().len(), EventKind::ALL.len());
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert_eq!(Catalog::new(Vec::new()), Err(Error::EmptyCatalog));
    }

    #[test]
    fn bad_weights_are_rejected() {
        for weight in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let res = Catalog::new(vec![def("A", Severity::Info, weight)]);
            assert!(matches!(res, Err(Error::InvalidWeight { .. })), "{weight} accepted");
        }
        let res = Catalog::new(vec![
            def("A", Severity::Info, f64::MAX),
            def("B", Severity::Info, f64::MAX),
        ]);
        assert_eq!(res, Err(Error::WeightOverflow));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let res = Catalog::new(vec![
            def("A", Severity::Info, 1.0),
            def("A", Severity::Debug, 2.0),
        ]);
        assert_eq!(res, Err(Error::DuplicateEvent("A".to_string())));
    }

    #[test]
    fn pick_follows_cumulative_weights() {
        let catalog = Catalog::new(vec![
            def("A", Severity::Info, 1.0),
            def("B", Severity::Warning, 2.0),
            def("C", Severity::Error, 3.0),
        ])
        .expect("valid catalog");
        assert_eq!(catalog.pick(0.0).definition().name, "A");
        assert_eq!(catalog.pick(0.999).definition().name, "A");
        assert_eq!(catalog.pick(1.0).definition().name, "B");
        assert_eq!(catalog.pick(2.999).definition().name, "B");
        assert_eq!(catalog.pick(3.0).definition().name, "C");
        assert_eq!(catalog.pick(5.999).definition().name, "C");
        // only reachable with a draw at or past the total
        assert!(matches!(catalog.pick(6.0), Pick::Fallback(d) if d.name == "C"));
    }

    #[test]
    fn single_definition_is_always_selected() {
        let catalog =
            Catalog::new(vec![def("ONLY", Severity::Debug, 0.25)]).expect("valid catalog");
        let mut rng = SmallRng::seed_from_u64(99);
        for _ in 0..1_000 {
            let pick = catalog.select(&mut rng);
            assert!(!pick.is_fallback());
            assert_eq!(pick.definition().name, "ONLY");
        }
    }

    #[test]
    fn reweighting_validates_names_and_weights() {
        let catalog = Catalog::default();
        let mut overrides = BTreeMap::new();
        overrides.insert("DATA_READ".to_string(), 100.0);
        let heavier = catalog.reweighted(&overrides).expect("valid override");
        assert!((heavier.total_weight() - (catalog.total_weight() + 80.0)).abs() < 1e-9);

        overrides.insert("NOPE".to_string(), 1.0);
        assert_eq!(
            catalog.reweighted(&overrides),
            Err(Error::UnknownOverride("NOPE".to_string()))
        );

        let mut zero = BTreeMap::new();
        zero.insert("DATA_READ".to_string(), 0.0);
        assert!(matches!(
            catalog.reweighted(&zero),
            Err(Error::InvalidWeight { .. })
        ));
    }

    #[test]
    fn empirical_frequency_tracks_weights() {
        const DRAWS: usize = 50_000;
        let catalog = Catalog::default();
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        for _ in 0..DRAWS {
            let pick = catalog.select(&mut rng);
            assert!(!pick.is_fallback());
            *counts.entry(pick.definition().name.as_str()).or_default() += 1;
        }
        for def in catalog.definitions() {
            let expected = def.weight / catalog.total_weight();
            let observed = counts.get(def.name.as_str()).copied().unwrap_or(0) as f64 / DRAWS as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "{}: observed {observed}, expected {expected}",
                def.name
            );
        }
    }

    proptest! {
        #[test]
        fn selection_never_falls_back(seed: u64, weights in prop::collection::vec(0.001_f64..1_000.0, 1..25)) {
            let definitions = weights
                .iter()
                .enumerate()
                .map(|(idx, weight)| def(&format!("E{idx}"), Severity::Info, *weight))
                .collect();
            let catalog = Catalog::new(definitions).expect("valid catalog");
            let mut rng = SmallRng::seed_from_u64(seed);
            for _ in 0..100 {
                prop_assert!(!catalog.select(&mut rng).is_fallback());
            }
        }
    }
}
