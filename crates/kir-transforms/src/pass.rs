//! Pass infrastructure: the [`Pass`] trait, a name-keyed [`PassRegistry`]
//! and a sequential [`PassManager`].

use indexmap::IndexMap;
use kir_core::verify::verify_program;
use kir_core::Program;

use crate::error::PassError;
use crate::outline::GpuKernelOutliningPass;
use crate::OutlineOptions;

/// A transformation over a whole program.
pub trait Pass {
    /// Identifier used to select the pass in a pipeline.
    fn name(&self) -> &'static str;

    /// One-line human readable summary.
    fn description(&self) -> &'static str;

    fn run(&mut self, program: &mut Program) -> Result<(), PassError>;
}

type PassConstructor = Box<dyn Fn() -> Box<dyn Pass>>;

struct RegisteredPass {
    description: &'static str,
    constructor: PassConstructor,
}

/// Passes available by name, in registration order.
#[derive(Default)]
pub struct PassRegistry {
    passes: IndexMap<&'static str, RegisteredPass>,
}

impl PassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pass. A later registration under the same name replaces
    /// the earlier one.
    pub fn register(
        &mut self,
        name: &'static str,
        description: &'static str,
        constructor: impl Fn() -> Box<dyn Pass> + 'static,
    ) {
        self.passes.insert(
            name,
            RegisteredPass {
                description,
                constructor: Box::new(constructor),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.passes.contains_key(name)
    }

    /// `(name, description)` pairs in registration order.
    pub fn list(&self) -> Vec<(&'static str, &'static str)> {
        self.passes
            .iter()
            .map(|(name, pass)| (*name, pass.description))
            .collect()
    }

    /// Instantiates the pass registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn Pass>, PassError> {
        self.passes
            .get(name)
            .map(|pass| (pass.constructor)())
            .ok_or_else(|| PassError::UnknownPass(name.to_string()))
    }
}

/// Registers every pass this crate provides.
pub fn register_builtin_passes(registry: &mut PassRegistry, options: &OutlineOptions) {
    let options = options.clone();
    registry.register(
        GpuKernelOutliningPass::NAME,
        GpuKernelOutliningPass::DESCRIPTION,
        move || Box::new(GpuKernelOutliningPass::new(options.clone())),
    );
}

/// Runs passes in order, optionally verifying the program after each one.
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
    verify_each: bool,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pipeline from pass names looked up in `registry`.
    pub fn from_pipeline<S: AsRef<str>>(
        registry: &PassRegistry,
        names: &[S],
    ) -> Result<Self, PassError> {
        let mut manager = PassManager::new();
        for name in names {
            manager.add(registry.create(name.as_ref())?);
        }
        Ok(manager)
    }

    pub fn add(&mut self, pass: Box<dyn Pass>) -> &mut Self {
        self.passes.push(pass);
        self
    }

    pub fn set_verify_each(&mut self, verify_each: bool) -> &mut Self {
        self.verify_each = verify_each;
        self
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn run(&mut self, program: &mut Program) -> Result<(), PassError> {
        for pass in &mut self.passes {
            tracing::info!(pass = pass.name(), "running pass");
            pass.run(program)?;

            if self.verify_each {
                let errors = verify_program(program);
                if !errors.is_empty() {
                    tracing::debug!(pass = pass.name(), errors = errors.len(), "verification failed");
                    return Err(PassError::Verification {
                        pass: pass.name().to_string(),
                        errors,
                    });
                }
            }
        }
        Ok(())
    }
}
