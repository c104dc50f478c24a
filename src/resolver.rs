//! Option resolution.
//!
//! Resolution merges three tiers into a complete configuration:
//! explicit overrides, then the prior configuration, then schema defaults.
//! The result holds every [`Field`] exactly once and nothing else.

use tracing::trace;

use crate::config::{Overrides, SimulationConfig};
use crate::error::OptionError;
use crate::schema::Field;

/// Which tier supplied a resolved field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Explicit override.
    Override,
    /// Prior configuration.
    Prior,
    /// Schema default.
    Default,
}

/// Picks the tier for one field.
#[must_use]
pub fn tier_for(field: Field, prior: Option<&SimulationConfig>, overrides: &Overrides) -> Tier {
    if overrides.contains(field) {
        Tier::Override
    } else if prior.is_some_and(|p| p.contains(field)) {
        Tier::Prior
    } else {
        Tier::Default
    }
}

/// Checks that every name in `prior` is a schema field.
///
/// Overrides are checked when they are built, so only the prior record can
/// still carry foreign names here.
pub fn check_names(prior: &SimulationConfig) -> Result<(), OptionError> {
    for name in prior.names() {
        name.parse::<Field>()?;
    }
    Ok(())
}

/// Resolves a configuration.
///
/// For each schema field the override is taken if present, else the prior
/// value, else the schema default. The prior is not modified.
///
/// # Errors
/// `UnknownOption` if the prior configuration names a field outside the
/// schema.
///
/// # Example
/// ```
/// use simdispatch::{resolve, Field, Overrides, SimulationConfig, Value};
///
/// let prior = SimulationConfig::new().with(Field::Seed, 1i64).with(Field::Report, 2);
/// let overrides = Overrides::new().set(Field::Seed, 9i64);
///
/// let resolved = resolve(Some(&prior), &overrides).unwrap();
/// assert_eq!(resolved.get(Field::Seed), Some(&Value::Int(9)));
/// assert_eq!(resolved.get(Field::Report), Some(&Value::Int(2)));
/// assert_eq!(resolved.get(Field::Solver), Some(&Value::from("nsm")));
/// assert!(resolved.is_complete());
/// ```
pub fn resolve(
    prior: Option<&SimulationConfig>,
    overrides: &Overrides,
) -> Result<SimulationConfig, OptionError> {
    if let Some(prior) = prior {
        check_names(prior)?;
    }

    let resolved = Field::ALL
        .into_iter()
        .map(|field| {
            let tier = tier_for(field, prior, overrides);
            trace!(field = field.name(), ?tier, "resolved field");
            let value = match tier {
                Tier::Override => overrides.get(field).cloned(),
                Tier::Prior => prior.and_then(|p| p.get(field)).cloned(),
                Tier::Default => None,
            }
            .unwrap_or_else(|| field.default_value());
            (field, value)
        })
        .collect();

    Ok(resolved)
}
