//! Cache decision engine
//!
//! One invocation either runs the cell and persists the requested variables,
//! or loads them from the cache and injects them into the session:
//!
//! ```text
//! validate -> decide -> run  -------------------------> done
//!                    \-> load -> (incomplete cache) -> run -> done
//! ```
//!
//! An incomplete cache moves from load to run at most once. Run never goes
//! back to load.

pub mod session;
pub mod vars;

pub use session::{CellSession, Namespace, Session};
pub use vars::{clean_var, clean_vars};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::capture::Console;
use crate::config::CellErrorPolicy;
use crate::error::CacheError;
use crate::fs::FileSystem;
use crate::logging::{operations, services, status};
use crate::store::{variable_path, TableStore, VariableStore};

/// Recompute/read-only flags of one invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    /// Always run the cell and overwrite the cache
    pub force: bool,
    /// Never run the cell; fail when a variable is not cached
    pub read: bool,
}

impl Policy {
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.force && self.read {
            return Err(CacheError::Config(
                "The 'force' and 'read' options are mutually exclusive.".to_string(),
            ));
        }
        Ok(())
    }
}

/// One cached cell invocation
#[derive(Debug, Clone)]
pub struct CacheRequest {
    /// Code of the cell
    pub cell: String,
    /// Cache directory; one sub-path per variable
    pub dir: PathBuf,
    /// Requested variable names, cleaned by the engine
    pub variables: Vec<String>,
    pub policy: Policy,
    /// Announce saved/loaded variables on the console
    pub verbose: bool,
}

impl CacheRequest {
    pub fn new<I, S>(cell: impl Into<String>, dir: impl Into<PathBuf>, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            cell: cell.into(),
            dir: dir.into(),
            variables: variables
                .into_iter()
                .map(|v| v.as_ref().to_string())
                .collect(),
            policy: Policy::default(),
            verbose: true,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.policy.force = force;
        self
    }

    pub fn read(mut self, read: bool) -> Self {
        self.policy.read = read;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Which branch an invocation takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Run,
    Load,
}

/// What an invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The cell ran and the variables were written.
    /// `recovered` is set when an incomplete cache forced the run.
    Saved {
        dir: PathBuf,
        variables: Vec<String>,
        recovered: bool,
    },
    /// The cell was skipped and the variables came from the cache.
    Loaded { dir: PathBuf, variables: Vec<String> },
    /// The cell raised under [`CellErrorPolicy::Report`]; nothing was saved.
    CellFailed { dir: PathBuf },
}

/// Decides between running a cell and loading its cached results
pub struct CacheEngine<T> {
    fs: Arc<dyn FileSystem>,
    store: VariableStore<T>,
    console: Console,
    on_cell_error: CellErrorPolicy,
}

impl<T: TableStore> CacheEngine<T> {
    /// `console` must be the console the session writes its output to.
    pub fn new(fs: Arc<dyn FileSystem>, tables: T, console: Console) -> Self {
        Self {
            fs,
            store: VariableStore::new(tables),
            console,
            on_cell_error: CellErrorPolicy::default(),
        }
    }

    pub fn with_cell_error_policy(mut self, policy: CellErrorPolicy) -> Self {
        self.on_cell_error = policy;
        self
    }

    pub fn filesystem(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn store(&self) -> &VariableStore<T> {
        &self.store
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Run when any variable needs it: forced, or absent and not read-only
    pub fn decide(&self, dir: &Path, variables: &[String], policy: Policy) -> Decision {
        let mut needs_run = false;

        for name in variables {
            let path = variable_path(dir, name);
            let variable_needs_run = policy.force || (!policy.read && !self.fs.exists(&path));
            debug!(
                service = services::ENGINE,
                operation = operations::DECIDE,
                variable = %name,
                path = %path.display(),
                needs_run = variable_needs_run,
                "checked variable"
            );
            needs_run |= variable_needs_run;
        }

        if needs_run {
            Decision::Run
        } else {
            Decision::Load
        }
    }

    /// Execute one cached cell invocation
    pub fn cache<S>(&self, session: &mut S, request: &CacheRequest) -> Result<Outcome, CacheError>
    where
        S: Session<Value = T::Table>,
    {
        request.policy.validate()?;
        if request.dir.as_os_str().is_empty() {
            return Err(CacheError::Config(
                "The path needs to be specified as a first argument.".to_string(),
            ));
        }

        let variables = clean_vars(&request.variables);
        if variables.is_empty() {
            return Err(CacheError::Config(
                "At least one variable name is required.".to_string(),
            ));
        }

        let decision = self.decide(&request.dir, &variables, request.policy);
        info!(
            service = services::ENGINE,
            operation = operations::DECIDE,
            path = %request.dir.display(),
            variables = %variables.join(", "),
            decision = ?decision,
            "cache decision"
        );

        match decision {
            Decision::Run => self.run(session, request, &variables, false),
            Decision::Load => match self.load(session, request, &variables) {
                Err(CacheError::MissingVariables { names, .. }) if !request.policy.read => {
                    warn!(
                        service = services::ENGINE,
                        operation = operations::LOAD,
                        status = status::MISS,
                        path = %request.dir.display(),
                        missing = %names.join(", "),
                        "cache incomplete, recomputing all variables"
                    );
                    self.run(session, request, &variables, true)
                }
                other => other,
            },
        }
    }

    fn run<S>(
        &self,
        session: &mut S,
        request: &CacheRequest,
        variables: &[String],
        recovered: bool,
    ) -> Result<Outcome, CacheError>
    where
        S: Session<Value = T::Table>,
    {
        info!(
            service = services::ENGINE,
            operation = operations::RUN,
            path = %request.dir.display(),
            recovered,
            "running cell"
        );

        let capture = self.console.capture()?;
        let result = session.run_cell(&request.cell);
        let captured = capture.finish();

        if let Err(err) = result {
            warn!(
                service = services::ENGINE,
                operation = operations::RUN,
                status = status::ERROR,
                path = %request.dir.display(),
                error = %err,
                "cell failed, cache left untouched"
            );
            captured.replay(&self.console);
            return match self.on_cell_error {
                CellErrorPolicy::Propagate => Err(CacheError::Execution(err)),
                CellErrorPolicy::Report => Ok(Outcome::CellFailed {
                    dir: request.dir.clone(),
                }),
            };
        }

        let saved = Self::extract(session, variables)
            .and_then(|cached| self.store.save(&request.dir, &cached));
        if let Err(err) = saved {
            captured.replay(&self.console);
            return Err(err);
        }

        session.clear_output();
        if request.verbose {
            self.console.println(&format!(
                "[Saved variables '{}' to directory '{}'.]",
                variables.join(", "),
                request.dir.display()
            ));
        }
        captured.replay(&self.console);

        if recovered {
            info!(
                service = services::ENGINE,
                operation = operations::SAVE,
                status = status::RECOVERED,
                path = %request.dir.display(),
                "incomplete cache rebuilt"
            );
        }

        Ok(Outcome::Saved {
            dir: request.dir.clone(),
            variables: variables.to_vec(),
            recovered,
        })
    }

    fn load<S>(
        &self,
        session: &mut S,
        request: &CacheRequest,
        variables: &[String],
    ) -> Result<Outcome, CacheError>
    where
        S: Session<Value = T::Table>,
    {
        let loaded = self.store.load(&request.dir, variables)?;
        session.push(loaded);

        if request.verbose {
            self.console.println(&format!(
                "[Skipped the cell's code and loaded variables {} from directory '{}'.]",
                variables.join(", "),
                request.dir.display()
            ));
        }

        Ok(Outcome::Loaded {
            dir: request.dir.clone(),
            variables: variables.to_vec(),
        })
    }

    /// Read the promised variables out of the namespace after a run
    fn extract<S>(session: &S, variables: &[String]) -> Result<BTreeMap<String, T::Table>, CacheError>
    where
        S: Session<Value = T::Table>,
    {
        let mut cached = BTreeMap::new();
        let mut missing = Vec::new();

        for name in variables {
            match session.variable(name) {
                Some(value) => {
                    cached.insert(name.clone(), value);
                }
                None => missing.push(name.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(CacheError::MissingNamespaceVariable { names: missing });
        }
        Ok(cached)
    }
}
