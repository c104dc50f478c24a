//! Schema enforcement.
//!
//! A [`Validator`] checks a resolved configuration before anything is built
//! or run. The pipeline only depends on the call contract; the shipped
//! [`StructuralValidator`] checks types and the dimensional consistency
//! solvers rely on, and hosts may plug in stricter rules.

use crate::config::{is_identifier, type_error, SimulationConfig};
use crate::error::ValidationError;
use crate::matrix::{DenseMatrix, SparseMatrix};
use crate::schema::Field;
use crate::value::Value;

/// Structural validation of a configuration.
pub trait Validator: Send + Sync {
    /// Returns the first violation found, naming the offending field.
    fn validate(&self, config: &SimulationConfig) -> Result<(), ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&SimulationConfig) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, config: &SimulationConfig) -> Result<(), ValidationError> {
        self(config)
    }
}

/// Problem size implied by a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelDims {
    /// Number of species (rows of `u0`).
    pub species: usize,
    /// Number of cells (columns of `u0`).
    pub cells: usize,
    /// Number of reactions (columns of `stoich`).
    pub reactions: usize,
}

impl ModelDims {
    /// Degrees of freedom: one per species per cell. `None` on overflow.
    #[must_use]
    pub const fn dofs(&self) -> Option<usize> {
        self.species.checked_mul(self.cells)
    }
}

/// Default validator: field types plus dimensional consistency.
///
/// Rules, in check order:
/// - control fields have their schema types; `solver` is an identifier;
///   `propensities` is non-empty when `compile` is on
/// - `tspan` is non-empty, finite, and non-decreasing
/// - `u0` is a non-empty species × cells matrix of non-negative integers
/// - `diffusion` is dofs × dofs, `stoich` is species × reactions,
///   `dep_graph` is reactions × (reactions + species)
/// - `vol` holds one positive volume per cell, `sd` one non-negative
///   integer subdomain per cell
/// - `data`, when non-empty, has one column per cell
/// - `gdata` is a vector, `solver_args` a list, `trajectory` null or a matrix
///
/// Opaque fields are never inspected.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralValidator;

impl StructuralValidator {
    /// Derives the problem size from `u0` and `stoich`.
    pub fn dimensions(config: &SimulationConfig) -> Result<ModelDims, ValidationError> {
        let u0 = dense(config, Field::U0)?;
        let stoich = sparse(config, Field::Stoich)?;
        Ok(ModelDims {
            species: u0.rows,
            cells: u0.cols,
            reactions: stoich.cols,
        })
    }

    fn check_control(config: &SimulationConfig) -> Result<(), ValidationError> {
        let solver = config.solver()?;
        if !is_identifier(solver) {
            return Err(ValidationError::invalid(
                Field::Solver.name(),
                format!("solver name {solver:?} is not an identifier"),
            ));
        }
        let propensities = config.propensities()?;
        if config.compile()? && propensities.trim().is_empty() {
            return Err(ValidationError::invalid(
                Field::Propensities.name(),
                "a propensity source is required when compile is on",
            ));
        }
        config.parse()?;
        config.report_level()?;
        config.seed()?;
        Ok(())
    }

    fn check_tspan(config: &SimulationConfig) -> Result<(), ValidationError> {
        let tspan = vector(config, Field::Tspan)?;
        if tspan.is_empty() {
            return Err(ValidationError::missing(Field::Tspan.name()));
        }
        if tspan.iter().any(|t| !t.is_finite()) {
            return Err(ValidationError::invalid(Field::Tspan.name(), "time points must be finite"));
        }
        if tspan.windows(2).any(|w| w[0] > w[1]) {
            return Err(ValidationError::invalid(
                Field::Tspan.name(),
                "time points must be non-decreasing",
            ));
        }
        Ok(())
    }

    fn check_u0(u0: &DenseMatrix) -> Result<(), ValidationError> {
        if u0.is_empty() {
            return Err(ValidationError::missing(Field::U0.name()));
        }
        if !u0.is_consistent() {
            let expected = u0.rows.checked_mul(u0.cols).map_or_else(
                || format!("shape {} to be addressable", u0.shape()),
                |n| format!("{n} entries"),
            );
            return Err(mismatch(Field::U0, expected, format!("{} entries", u0.data.len())));
        }
        if !u0.data.iter().all(|&x| is_count(x)) {
            return Err(ValidationError::invalid(
                Field::U0.name(),
                "initial copy numbers must be non-negative integers",
            ));
        }
        Ok(())
    }

    fn check_sparse_shape(
        config: &SimulationConfig,
        field: Field,
        rows: usize,
        cols: usize,
    ) -> Result<(), ValidationError> {
        let m = sparse(config, field)?;
        m.check_structure()
            .map_err(|reason| ValidationError::invalid(field.name(), reason))?;
        if (m.rows, m.cols) != (rows, cols) {
            return Err(mismatch(field, format!("shape {rows}x{cols}"), format!("shape {}", m.shape())));
        }
        Ok(())
    }

    fn check_per_cell(
        config: &SimulationConfig,
        field: Field,
        cells: usize,
        entry_ok: fn(f64) -> bool,
        rule: &str,
    ) -> Result<(), ValidationError> {
        let v = vector(config, field)?;
        if v.len() != cells {
            return Err(mismatch(field, format!("{cells} entries"), format!("{} entries", v.len())));
        }
        if !v.iter().all(|&x| entry_ok(x)) {
            return Err(ValidationError::invalid(field.name(), rule));
        }
        Ok(())
    }

    fn check_optional(config: &SimulationConfig, dims: ModelDims) -> Result<(), ValidationError> {
        if let Some(value) = config.get(Field::Data) {
            let data = value
                .as_matrix()
                .ok_or_else(|| type_error(Field::Data, "a matrix", value))?;
            if !data.is_empty() && (data.cols != dims.cells || !data.is_consistent()) {
                return Err(mismatch(
                    Field::Data,
                    format!("{} columns", dims.cells),
                    format!("shape {}", data.shape()),
                ));
            }
        }
        if let Some(value) = config.get(Field::Gdata) {
            value
                .as_vector()
                .ok_or_else(|| type_error(Field::Gdata, "a vector", value))?;
        }
        if let Some(value) = config.get(Field::SolverArgs) {
            value
                .to_list()
                .ok_or_else(|| type_error(Field::SolverArgs, "a list", value))?;
        }
        match config.get(Field::Trajectory) {
            None | Some(Value::Null | Value::Matrix(_)) => Ok(()),
            Some(other) => Err(type_error(Field::Trajectory, "null or a matrix", other)),
        }
    }
}

impl Validator for StructuralValidator {
    fn validate(&self, config: &SimulationConfig) -> Result<(), ValidationError> {
        Self::check_control(config)?;
        Self::check_tspan(config)?;
        Self::check_u0(dense(config, Field::U0)?)?;

        let dims = Self::dimensions(config)?;
        let dofs = dims
            .dofs()
            .ok_or_else(|| ValidationError::invalid(Field::U0.name(), "species x cells overflows"))?;
        Self::check_sparse_shape(config, Field::Diffusion, dofs, dofs)?;
        Self::check_sparse_shape(config, Field::Stoich, dims.species, dims.reactions)?;
        let dep_cols = dims.reactions.checked_add(dims.species).ok_or_else(|| {
            ValidationError::invalid(Field::DepGraph.name(), "reactions + species overflows")
        })?;
        Self::check_sparse_shape(config, Field::DepGraph, dims.reactions, dep_cols)?;
        Self::check_per_cell(
            config,
            Field::Vol,
            dims.cells,
            |v| v.is_finite() && v > 0.0,
            "volumes must be positive",
        )?;
        Self::check_per_cell(
            config,
            Field::Sd,
            dims.cells,
            is_count,
            "subdomains must be non-negative integers",
        )?;
        Self::check_optional(config, dims)
    }
}

fn is_count(x: f64) -> bool {
    x.is_finite() && x >= 0.0 && x.fract() == 0.0
}

fn mismatch(field: Field, expected: String, actual: String) -> ValidationError {
    ValidationError::DimensionMismatch {
        field: field.name().to_string(),
        expected,
        actual,
    }
}

fn vector(config: &SimulationConfig, field: Field) -> Result<&[f64], ValidationError> {
    let value = config.require(field)?;
    value
        .as_vector()
        .ok_or_else(|| type_error(field, "a vector", value))
}

fn dense(config: &SimulationConfig, field: Field) -> Result<&DenseMatrix, ValidationError> {
    let value = config.require(field)?;
    value
        .as_matrix()
        .ok_or_else(|| type_error(field, "a matrix", value))
}

fn sparse(config: &SimulationConfig, field: Field) -> Result<&SparseMatrix, ValidationError> {
    let value = config.require(field)?;
    value
        .as_sparse()
        .ok_or_else(|| type_error(field, "a sparse matrix", value))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Overrides;
    use crate::resolver::resolve;

    /// Two species, three cells, one reaction `A -> B`.
    pub(crate) fn small_model() -> SimulationConfig {
        let species = 2;
        let cells = 3;
        let dofs = species * cells;
        let diffusion: Vec<(usize, usize, f64)> = (0..dofs).map(|i| (i, i, -1.0)).collect();

        let overrides = Overrides::new()
            .set(Field::Propensities, "model")
            .set(Field::Tspan, vec![0.0, 0.5, 1.0])
            .set(
                Field::U0,
                DenseMatrix::from_column_major(species, cells, vec![10.0, 0.0, 5.0, 0.0, 0.0, 1.0])
                    .unwrap(),
            )
            .set(Field::Diffusion, SparseMatrix::from_triplets(dofs, dofs, &diffusion).unwrap())
            .set(
                Field::Stoich,
                SparseMatrix::from_triplets(species, 1, &[(0, 0, -1.0), (1, 0, 1.0)]).unwrap(),
            )
            .set(Field::DepGraph, SparseMatrix::from_triplets(1, 3, &[(0, 0, 1.0), (0, 2, 1.0)]).unwrap())
            .set(Field::Vol, vec![1.0, 1.0, 2.0])
            .set(Field::Sd, vec![1.0, 1.0, 2.0]);

        resolve(None, &overrides).unwrap()
    }

    #[test]
    fn small_model_is_valid() {
        StructuralValidator.validate(&small_model()).unwrap();
        let dims = StructuralValidator::dimensions(&small_model()).unwrap();
        assert_eq!(dims, ModelDims { species: 2, cells: 3, reactions: 1 });
        assert_eq!(dims.dofs(), Some(6));
    }

    #[test]
    fn defaults_alone_are_missing_inputs() {
        let config = resolve(None, &Overrides::new().set(Field::Compile, false)).unwrap();
        let err = StructuralValidator.validate(&config).unwrap_err();
        assert_eq!(err, ValidationError::missing("tspan"));
    }

    #[test]
    fn compile_requires_propensity_source() {
        let config = small_model().with(Field::Propensities, "");
        let err = StructuralValidator.validate(&config).unwrap_err();
        assert_eq!(err.field(), "propensities");

        let config = config.with(Field::Compile, false);
        StructuralValidator.validate(&config).unwrap();
    }

    #[test]
    fn solver_must_be_an_identifier() {
        let config = small_model().with(Field::Solver, "../nsm");
        assert_eq!(StructuralValidator.validate(&config).unwrap_err().field(), "solver");
    }

    #[test]
    fn decreasing_tspan_is_rejected() {
        let config = small_model().with(Field::Tspan, vec![0.0, 2.0, 1.0]);
        assert_eq!(StructuralValidator.validate(&config).unwrap_err().field(), "tspan");
    }

    #[test]
    fn fractional_copy_numbers_are_rejected() {
        let config = small_model().with(
            Field::U0,
            DenseMatrix::from_column_major(2, 3, vec![0.5, 0.0, 5.0, 0.0, 0.0, 1.0]).unwrap(),
        );
        assert_eq!(StructuralValidator.validate(&config).unwrap_err().field(), "u0");
    }

    #[test]
    fn shape_mismatches_name_the_field() {
        let config = small_model().with(Field::Diffusion, SparseMatrix::empty(5, 5).unwrap());
        let err = StructuralValidator.validate(&config).unwrap_err();
        assert!(matches!(err, ValidationError::DimensionMismatch { .. }));
        assert_eq!(err.field(), "diffusion");

        let config = small_model().with(Field::DepGraph, SparseMatrix::empty(1, 2).unwrap());
        assert_eq!(StructuralValidator.validate(&config).unwrap_err().field(), "dep_graph");

        let config = small_model().with(Field::Vol, vec![1.0, 1.0]);
        assert_eq!(StructuralValidator.validate(&config).unwrap_err().field(), "vol");

        let config = small_model().with(Field::Data, DenseMatrix::zeros(1, 2));
        assert_eq!(StructuralValidator.validate(&config).unwrap_err().field(), "data");
    }

    #[test]
    fn non_positive_volume_is_rejected() {
        let config = small_model().with(Field::Vol, vec![1.0, 0.0, 1.0]);
        assert_eq!(StructuralValidator.validate(&config).unwrap_err().field(), "vol");
    }

    #[test]
    fn opaque_fields_are_not_inspected() {
        let config = small_model()
            .with(Field::Vis, Value::Opaque(serde_json::json!({"anything": [1, "x"]})))
            .with(Field::Extra, "free text");
        StructuralValidator.validate(&config).unwrap();
    }

    #[test]
    fn closures_are_validators() {
        let reject = |_: &SimulationConfig| -> Result<(), ValidationError> {
            Err(ValidationError::missing("vis"))
        };
        assert!(reject.validate(&small_model()).is_err());
    }

    #[test]
    fn oversized_shapes_are_errors_not_panics() {
        let u0: DenseMatrix =
            serde_json::from_str(r#"{"rows":4611686018427387904,"cols":8,"data":[1.0]}"#).unwrap();
        let err = StructuralValidator.validate(&small_model().with(Field::U0, u0)).unwrap_err();
        assert!(matches!(err, ValidationError::DimensionMismatch { .. }));
        assert_eq!(err.field(), "u0");

        let diffusion = SparseMatrix {
            rows: 6,
            cols: usize::MAX,
            col_ptr: vec![0],
            row_idx: Vec::new(),
            values: Vec::new(),
        };
        let err = StructuralValidator
            .validate(&small_model().with(Field::Diffusion, diffusion))
            .unwrap_err();
        assert_eq!(err.field(), "diffusion");

        let stoich = SparseMatrix {
            rows: 2,
            cols: usize::MAX,
            col_ptr: vec![0],
            row_idx: Vec::new(),
            values: Vec::new(),
        };
        let err = StructuralValidator
            .validate(&small_model().with(Field::Stoich, stoich))
            .unwrap_err();
        assert_eq!(err.field(), "stoich");

        let dims = ModelDims { species: usize::MAX, cells: 2, reactions: 1 };
        assert_eq!(dims.dofs(), None);
    }
}
