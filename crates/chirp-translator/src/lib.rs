//! Class loading, translation and dead-code elimination for the Chirp
//! VM suite linker.
//!
//! The [`Translator`] drives one compilation unit from `open` to
//! `close`: it loads class definitions on demand, converts method
//! bodies to Chirp bytecode in two phases, and, when whole-suite
//! translation is selected, runs dead-method and dead-class
//! elimination between the phases so that phase-2 constant-table
//! compaction knows which references are dead.
//!
//! The pipeline is single-threaded and batch-oriented: one
//! `open`/`close` runs to completion, a fatal error aborts the whole
//! `close` call, and the suite must not be touched by other subsystems
//! while a close is in flight.

pub mod class_unit;
pub mod code;
pub mod dce;
pub mod emitter;
pub mod error;
pub mod method_db;
pub mod object_table;
pub mod options;
pub mod verifier;

pub use dce::DeadClassEliminator;
pub use error::{TranslateError, TranslateResult};
pub use method_db::{DeadMethodEliminator, MethodDb};
pub use options::{Options, Properties, TranslationStrategy};

use class_unit::ClassUnit;
use chirp_classfile::{
    parse_class_modifiers, parse_member_modifiers, ClassDefinition, ClassFileLoader,
    DirClasspath, LoadError, MethodDefinition,
};
use chirp_suite::klass::is_valid_internal_name;
use chirp_suite::member::{Field, Method};
use chirp_suite::{KlassId, KlassKind, KlassState, ResourceFile, Suite, SuiteKind};
use code::MethodSource;
use rustc_hash::FxHashMap;
use std::time::Instant;
use tracing::{debug, info};

/// Loads, links and translates classes into a suite.
pub struct Translator {
    suite: Suite,
    options: Options,
    strategy: TranslationStrategy,
    loader: Box<dyn ClassFileLoader>,
    class_units: FxHashMap<String, ClassUnit>,
    method_db: MethodDb,
    dme: Option<DeadMethodEliminator>,
    /// Class names currently being loaded; detects hierarchy cycles.
    loading_stack: Vec<String>,
    /// Class names currently being converted, reported on fatal errors.
    /// Must be empty when `close` returns.
    context_stack: Vec<String>,
    progress: u32,
}

impl Translator {
    /// Opens a translation unit over a directory classpath. The option
    /// snapshot and the translation strategy are fixed here, before any
    /// class is touched.
    pub fn open(suite: Suite, classpath: &str, props: &Properties) -> TranslateResult<Translator> {
        let loader = DirClasspath::open(classpath).map_err(|e| {
            TranslateError::Linkage(format!(
                "error while setting class path from '{}': {}",
                classpath, e
            ))
        })?;
        Self::open_with_loader(suite, Box::new(loader), props)
    }

    /// Opens a translation unit over an arbitrary class-file loader.
    pub fn open_with_loader(
        suite: Suite,
        loader: Box<dyn ClassFileLoader>,
        props: &Properties,
    ) -> TranslateResult<Translator> {
        let options = Options::from_properties(props);
        let strategy = options.strategy();
        if options.verbose {
            info!(?strategy, ?options, "translator opened");
        }
        Ok(Translator {
            suite,
            options,
            strategy,
            loader,
            class_units: FxHashMap::default(),
            method_db: MethodDb::new(),
            dme: None,
            loading_stack: Vec::new(),
            context_stack: Vec::new(),
            progress: 0,
        })
    }

    pub fn suite(&self) -> &Suite {
        &self.suite
    }

    pub(crate) fn suite_mut(&mut self) -> &mut Suite {
        &mut self.suite
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn strategy(&self) -> TranslationStrategy {
        self.strategy
    }

    pub fn method_db(&self) -> &MethodDb {
        &self.method_db
    }

    pub(crate) fn method_db_mut(&mut self) -> &mut MethodDb {
        &mut self.method_db
    }

    /// Verdict of the usage index for one method; everything is live
    /// until dead-method elimination has run.
    pub(crate) fn is_method_live(&self, mref: chirp_suite::MethodRef) -> bool {
        match &self.dme {
            Some(dme) => dme.is_marked_used(&mref),
            None => true,
        }
    }

    pub(crate) fn class_unit_for(&self, id: KlassId) -> Option<&ClassUnit> {
        self.class_units.get(self.suite.get(id).name())
    }

    /// True if `name` is a well-formed source-form class name
    /// (`.`-separated, no `/`).
    pub fn is_valid_class_name(name: &str) -> bool {
        !name.contains('/') && is_valid_internal_name(&name.replace('.', "/"))
    }

    /// Registers `name` in the suite, interning.
    pub(crate) fn ensure_registered(&mut self, name: &str) -> TranslateResult<KlassId> {
        self.suite
            .register_stub(name)
            .map_err(|e| TranslateError::Linkage(e.to_string()))
    }

    /// Installs a resource file into the suite, passing the bytes back.
    pub fn add_resource(&mut self, name: &str, bytes: Vec<u8>) -> &[u8] {
        self.suite.install_resource(ResourceFile {
            name: name.to_string(),
            bytes,
        });
        let resources = self.suite.resources();
        &resources[resources.len() - 1].bytes
    }

    /// Loads a class's definition from its class file. No-op for classes
    /// already at `Loaded` or beyond; array classes load their component
    /// type instead.
    pub fn load(&mut self, id: KlassId) -> TranslateResult<()> {
        let klass = self.suite.get(id);
        if klass.state() == KlassState::Error {
            return Err(TranslateError::Linkage(format!(
                "class {} previously failed to link",
                klass.name()
            )));
        }
        if klass.state() >= KlassState::Loaded {
            return Ok(());
        }
        if let Some(component) = klass.component_type() {
            return self.load(component);
        }
        let name = klass.name().to_string();
        if klass.is_synthetic() || klass.is_primitive() {
            return self.suite.get_mut(id).advance(KlassState::Loaded).map_err(Into::into);
        }

        if self.loading_stack.contains(&name) {
            return Err(TranslateError::Linkage(format!(
                "class circularity: {} -> {}",
                self.loading_stack.join(" -> "),
                name
            )));
        }
        self.loading_stack.push(name.clone());
        self.context_stack.push(name.clone());
        let result = self.load_inner(id, &name);
        self.context_stack.pop();
        self.loading_stack.pop();
        match result {
            Ok(()) => {
                self.suite.get_mut(id).advance(KlassState::Loaded)?;
                Ok(())
            }
            Err(e) => {
                self.suite.get_mut(id).force_error();
                Err(e)
            }
        }
    }

    fn load_inner(&mut self, id: KlassId, name: &str) -> TranslateResult<()> {
        debug!(class = name, "loading");
        let def = match self.loader.find_class(name) {
            Ok(def) => def,
            Err(LoadError::NotFound { class }) => {
                return Err(TranslateError::ClassNotFound {
                    class,
                    path: self.context_stack.clone(),
                });
            }
            Err(other) => return Err(TranslateError::Linkage(other.to_string())),
        };
        self.install_definition(id, def)
    }

    /// Resolves a parsed definition against the suite and installs it:
    /// superclass and interfaces are loaded eagerly, signature types are
    /// registered as stubs, and the class's translation unit is created
    /// with the unlinked method bodies.
    fn install_definition(&mut self, id: KlassId, def: ClassDefinition) -> TranslateResult<()> {
        let name = self.suite.get(id).name().to_string();
        if def.name != name {
            return Err(TranslateError::Linkage(format!(
                "class file for {} defines {}",
                name, def.name
            )));
        }
        let class_modifiers = parse_class_modifiers(&def.modifiers, &name)
            .map_err(|e| TranslateError::Linkage(e.to_string()))?;

        let object = self.suite.object_class();
        let superclass = match &def.superclass {
            Some(s) => Some(self.ensure_registered(s)?),
            None if id != object => Some(object),
            None => None,
        };
        if let Some(s) = superclass {
            self.load(s)?;
        }
        let mut interfaces = Vec::with_capacity(def.interfaces.len());
        for iface in &def.interfaces {
            let iface_id = self.ensure_registered(iface)?;
            self.load(iface_id)?;
            interfaces.push(iface_id);
        }

        let mut static_fields = Vec::new();
        let mut instance_fields = Vec::new();
        for f in &def.fields {
            let ty = self.ensure_registered(&f.ty)?;
            let field_modifiers =
                parse_member_modifiers(&f.modifiers, &format!("{}.{}", name, f.name))
                    .map_err(|e| TranslateError::Linkage(e.to_string()))?;
            let field = Field {
                name: f.name.clone(),
                modifiers: field_modifiers,
                ty,
            };
            if f.is_static {
                static_fields.push(field);
            } else {
                instance_fields.push(field);
            }
        }

        let mut static_methods = Vec::new();
        let mut virtual_methods = Vec::new();
        let mut static_sources = Vec::new();
        let mut virtual_sources = Vec::new();
        for m in def.methods {
            let is_static = m.is_static;
            let (meta, source) = self.install_method(&name, m)?;
            if is_static {
                static_methods.push(meta);
                static_sources.push(source);
            } else {
                virtual_methods.push(meta);
                virtual_sources.push(source);
            }
        }

        let klass = self.suite.get_mut(id);
        if def.interface {
            klass.set_kind(KlassKind::Interface);
        }
        klass.set_modifiers(class_modifiers);
        klass.set_symbol_flags(def.internal, def.dynamic);
        klass.set_superclass(superclass);
        klass.set_interfaces(interfaces);
        klass.set_fields(static_fields, instance_fields);
        klass.set_methods(static_methods, virtual_methods);

        let unit = ClassUnit::new(id, &name, static_sources, virtual_sources, &self.options);
        self.class_units.insert(name, unit);
        Ok(())
    }

    fn install_method(
        &mut self,
        class_name: &str,
        m: MethodDefinition,
    ) -> TranslateResult<(Method, Option<MethodSource>)> {
        let context = format!("{}.{}", class_name, m.name);
        let method_modifiers = parse_member_modifiers(&m.modifiers, &context)
            .map_err(|e| TranslateError::Linkage(e.to_string()))?;
        let return_type = self.ensure_registered(&m.return_type)?;
        let mut param_types = Vec::with_capacity(m.params.len());
        for p in &m.params {
            param_types.push(self.ensure_registered(p)?);
        }
        let meta = Method {
            name: m.name,
            modifiers: method_modifiers,
            return_type,
            param_types,
        };
        let source = if meta.has_no_body() {
            if !m.body.is_empty() {
                return Err(TranslateError::Linkage(format!(
                    "method {} is declared without code but has a body",
                    context
                )));
            }
            None
        } else {
            if m.body.is_empty() {
                return Err(TranslateError::Linkage(format!(
                    "method {} has no code",
                    context
                )));
            }
            let mut handlers = Vec::with_capacity(m.handlers.len());
            for h in &m.handlers {
                handlers.push(self.ensure_registered(&h.catch_type)?);
            }
            Some(MethodSource {
                instructions: m.body,
                handlers,
            })
        };
        Ok((meta, source))
    }

    /// Runs phase 1 for a class (and everything its hierarchy needs).
    /// No-op for classes already at `Converting` or beyond; in the
    /// one-pass strategies this completes phase 2 too.
    pub fn convert(&mut self, id: KlassId) -> TranslateResult<()> {
        let name = self.suite.get(id).name().to_string();
        self.context_stack.push(name);
        let result = self.convert_inner(id);
        self.context_stack.pop();
        result
    }

    fn convert_inner(&mut self, id: KlassId) -> TranslateResult<()> {
        let (state, name, is_array, is_fileless) = {
            let klass = self.suite.get(id);
            (
                klass.state(),
                klass.name().to_string(),
                klass.is_array(),
                klass.is_synthetic() || klass.is_primitive(),
            )
        };
        if state == KlassState::Error {
            return Err(TranslateError::Linkage(format!(
                "class {} previously failed to link",
                name
            )));
        }
        if state >= KlassState::Converting {
            return Ok(());
        }

        if is_array {
            // The array's own translation is the root object class's;
            // the component type is closed over by the registry scan.
            let object = self.suite.object_class();
            self.convert(object)?;
            return self
                .suite
                .get_mut(id)
                .advance(KlassState::Converted)
                .map_err(Into::into);
        }
        if is_fileless {
            return self
                .suite
                .get_mut(id)
                .advance(KlassState::Converted)
                .map_err(Into::into);
        }

        self.load(id)?;
        self.trace_progress();

        let Some(mut unit) = self.class_units.remove(&name) else {
            panic!("no translation unit for {} (state {:?})", name, state);
        };
        debug_assert_eq!(unit.klass(), id);

        let generate_ir = self.strategy != TranslationStrategy::ByMethod;
        if let Err(e) = unit.convert_phase1(self, generate_ir) {
            self.suite.get_mut(id).force_error();
            return Err(e);
        }

        if self.strategy.is_whole_program() {
            // Keep the unit: phase 2 runs after whole-suite analysis.
            self.class_units.insert(name, unit);
        } else {
            let one_pass = self.strategy == TranslationStrategy::ByMethod;
            if let Err(e) = unit.convert_phase2(self, one_pass) {
                self.suite.get_mut(id).force_error();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Runs phase 2 for a class during whole-suite translation; the
    /// unit's IR memory is released as soon as the class completes.
    pub(crate) fn convert_phase2_klass(&mut self, id: KlassId) -> TranslateResult<()> {
        self.convert(id)?;
        let klass = self.suite.get(id);
        if klass.state() == KlassState::Error {
            return Err(TranslateError::Linkage(format!(
                "class {} previously failed to link",
                klass.name()
            )));
        }
        if klass.state() >= KlassState::Converted {
            return Ok(());
        }

        let name = klass.name().to_string();
        self.context_stack.push(name.clone());
        let result = match self.class_units.remove(&name) {
            Some(mut unit) => unit.convert_phase2(self, false),
            None => panic!("no translation unit for {} in phase 2", name),
        };
        self.context_stack.pop();
        if let Err(e) = result {
            self.suite.get_mut(id).force_error();
            return Err(e);
        }
        Ok(())
    }

    /// Loads and converts the closure of classes in the suite. Loading
    /// or converting a class can register new classes, so full scans
    /// repeat until one pass makes no progress.
    pub fn compute_closure(&mut self) -> TranslateResult<()> {
        let mut changed = true;
        while changed {
            changed = false;
            let mut index = 0;
            // The registry can grow mid-scan; re-read the bound.
            while index < self.suite.len() {
                let id = KlassId(index as u32);
                if self.suite.get(id).state() < KlassState::Loaded {
                    self.load(id)?;
                    changed = true;
                }
                if self.suite.get(id).state() < KlassState::Converting {
                    self.convert(id)?;
                    changed = true;
                }
                index += 1;
            }
        }
        Ok(())
    }

    /// Drives the closure to completion for the given suite kind and
    /// returns the finalized suite: every registered class `Converted`,
    /// whole-suite analyses run, phase 2 emitted, unit cache cleared.
    pub fn close(mut self, kind: SuiteKind) -> TranslateResult<Suite> {
        let start = Instant::now();
        if self.options.verbose {
            info!(kind = kind.name(), "computing closure");
        }
        self.compute_closure()?;

        if self.strategy.is_whole_program() {
            if self.options.verbose {
                info!(elapsed_ms = start.elapsed().as_millis() as u64, "closure complete");
            }

            if self.options.dead_method_elimination {
                let mut dme = DeadMethodEliminator::new();
                dme.compute_methods_used(&self.suite, &self.method_db, kind, &self.options);
                self.dme = Some(dme);
            }

            let mut dce = DeadClassEliminator::new();
            let unused = dce.compute_classes_used(&self, kind);
            self.suite.set_unused_classes(unused);

            for index in 0..self.suite.len() {
                self.convert_phase2_klass(KlassId(index as u32))?;
            }
        }
        self.class_units.clear();

        assert!(
            self.context_stack.is_empty(),
            "conversion stack not empty at close: {:?}",
            self.context_stack
        );
        if self.options.verbose {
            info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                classes = self.suite.len(),
                unused = self.suite.unused_classes().len(),
                "translation complete"
            );
        }
        Ok(self.suite)
    }

    fn trace_progress(&mut self) {
        self.progress += 1;
        if self.options.verbose && self.progress % 40 == 0 {
            info!(converted = self.progress, "progress");
        }
    }
}
