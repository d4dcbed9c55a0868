//! The Rhai-backed script action and its factory service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rhai::module_resolvers::StaticModuleResolver;
use rhai::{Array, Engine, Module, Scope};
use tracing::{debug, info, warn};

use terrabatch_config::{ActionConfiguration, PropertySchema};
use terrabatch_flow::{
    Action, ActionError, ActionService, BaseAction, Event, EventQueue, ProgressForwarder,
};

use crate::modules::{ModuleRegistry, MODULE_DIR_NAME};

/// Name of the entry function every script must define:
/// `execute(config, input, progress) -> array of output paths`.
pub const ENTRY_FUNCTION: &str = "execute";

/// The scripting language supported by this deployment.
pub const LANGUAGE_RHAI: &str = "rhai";

/// Progress-forwarding handle exposed to scripts.
///
/// Scripts call `progress.set_task("...")` and `progress.report(0.5)` to
/// reach the owning action's listeners.
#[derive(Clone)]
pub struct ProgressHandle {
    forwarder: ProgressForwarder,
}

impl ProgressHandle {
    fn set_task(&mut self, task: &str) {
        self.forwarder.set_task(task);
    }

    fn report(&mut self, fraction: f64) {
        self.forwarder.progressing(fraction as f32);
    }
}

/// An action whose behavior is loaded from a Rhai script at run time.
///
/// Single-use: the engine handle is released after the run (success or
/// failure) and a second `execute` on the same instance is rejected;
/// construct a fresh instance per run, as the flow manager does.
pub struct ScriptAction {
    base: BaseAction,
    config: ActionConfiguration,
    script_file: PathBuf,
    registry: Arc<ModuleRegistry>,
    engine: Option<Engine>,
}

impl ScriptAction {
    /// Build a script action from its bound configuration.
    ///
    /// Requires a `script_file` property; the optional `language` property
    /// must name a supported interpreter.
    pub fn new(
        config: ActionConfiguration,
        registry: Arc<ModuleRegistry>,
    ) -> Result<Self, ActionError> {
        let script_file = config
            .scalar("script_file")
            .map(PathBuf::from)
            .ok_or_else(|| {
                ActionError::new(config.name(), "missing required property 'script_file'")
            })?;

        let language = config.scalar("language").unwrap_or(LANGUAGE_RHAI);
        if language != LANGUAGE_RHAI {
            return Err(ActionError::new(
                config.name(),
                format!("unsupported script language '{language}'"),
            ));
        }

        let mut engine = Engine::new();
        engine
            .register_type_with_name::<ProgressHandle>("Progress")
            .register_fn("set_task", ProgressHandle::set_task)
            .register_fn("report", ProgressHandle::report);

        Ok(Self {
            base: BaseAction::new(&config),
            config,
            script_file,
            registry,
            engine: Some(engine),
        })
    }

    /// Compile every registered module and hand the set to the engine as a
    /// static resolver, so scripts can `import` them by file stem.
    /// Per-module failures are logged and the module is left out.
    fn install_modules(&self, engine: &mut Engine) {
        let module_dir = self
            .script_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(MODULE_DIR_NAME);
        let added = self.registry.register_dir(&module_dir);
        info!(
            action = %self.base.name(),
            dir = %module_dir.display(),
            added,
            total = self.registry.len(),
            "script modules registered"
        );

        let mut resolver = StaticModuleResolver::new();
        for (name, path) in self.registry.modules() {
            let stem = match Path::new(&name).file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            let compiled = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|text| engine.compile(&text).map_err(|e| e.to_string()))
                .and_then(|ast| {
                    Module::eval_ast_as_new(Scope::new(), &ast, engine).map_err(|e| e.to_string())
                });
            match compiled {
                Ok(module) => {
                    debug!(module = %stem, "script module compiled");
                    resolver.insert(stem, module);
                }
                Err(e) => warn!(module = %name, error = %e, "script module skipped"),
            }
        }
        engine.set_module_resolver(resolver);
    }

    /// Evaluate the script in a fresh scope and invoke the entry function.
    fn run_script(
        &self,
        mut engine: Engine,
        forwarder: &ProgressForwarder,
        events: &mut EventQueue,
    ) -> Result<EventQueue, ActionError> {
        let name = self.base.name().to_string();

        forwarder.set_task("loading script modules");
        self.install_modules(&mut engine);

        forwarder.set_task("evaluating script");
        if !self.script_file.is_file() {
            return Err(ActionError::new(
                &name,
                format!("script file not found: {}", self.script_file.display()),
            ));
        }
        let source = std::fs::read_to_string(&self.script_file).map_err(|e| {
            ActionError::with_cause(
                &name,
                format!("failed to read script {}", self.script_file.display()),
                e,
            )
        })?;
        let ast = engine
            .compile(&source)
            .map_err(|e| ActionError::with_cause(&name, "script compilation failed", e))?;

        let first = events
            .front()
            .ok_or_else(|| ActionError::new(&name, "input event queue is empty"))?;
        let input_path = std::path::absolute(first.path())
            .unwrap_or_else(|_| first.path().to_path_buf())
            .display()
            .to_string();

        // Fresh, isolated context per invocation: nothing carries over from
        // a previous run of any script.
        let mut scope = Scope::new();
        let events_dyn = rhai::serde::to_dynamic(&*events)
            .map_err(|e| ActionError::with_cause(&name, "cannot expose event queue", *e))?;
        scope.push_dynamic("event_list", events_dyn);
        scope.push(
            "running_context",
            self.base.running_context().unwrap_or_default().to_string(),
        );

        let config_dyn = rhai::serde::to_dynamic(&self.config)
            .map_err(|e| ActionError::with_cause(&name, "cannot expose configuration", *e))?;
        let handle = ProgressHandle {
            forwarder: forwarder.clone(),
        };

        forwarder.set_task(&format!(
            "executing script: {}",
            self.script_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));
        // call_fn evaluates the AST's global statements (imports included)
        // before invoking the entry function.
        let outputs: Array = engine
            .call_fn(&mut scope, &ast, ENTRY_FUNCTION, (config_dyn, input_path, handle))
            .map_err(|e| ActionError::with_cause(&name, "script evaluation failed", *e))?;

        // Inputs are consumed, not passed through.
        events.clear();

        let mut produced = EventQueue::new();
        for item in outputs {
            if item.is_unit() {
                continue;
            }
            match item.into_string() {
                Ok(path) => produced.push_back(Event::added(PathBuf::from(path))),
                Err(type_name) => {
                    warn!(action = %name, type_name, "script returned a non-path output, skipping")
                }
            }
        }
        Ok(produced)
    }
}

impl Action for ScriptAction {
    fn base(&self) -> &BaseAction {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseAction {
        &mut self.base
    }

    fn execute(&mut self, mut events: EventQueue) -> Result<EventQueue, ActionError> {
        // The engine handle is released after this run whatever happens.
        let engine = self.engine.take().ok_or_else(|| {
            ActionError::new(
                self.base.name(),
                "script action already consumed; construct a new instance per run",
            )
        })?;

        let forwarder = self.base.forwarder().clone();
        forwarder.started();
        match self.run_script(engine, &forwarder, &mut events) {
            Ok(produced) => {
                forwarder.completed();
                Ok(produced)
            }
            Err(e) => {
                forwarder.failed(&e);
                Err(e)
            }
        }
    }

    fn destroy(&mut self) {
        self.engine = None;
    }
}

/// Factory creating [`ScriptAction`]s, sharing one module registry across
/// every action it creates.
pub struct ScriptActionService {
    registry: Arc<ModuleRegistry>,
}

impl ScriptActionService {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ModuleRegistry::new()),
        }
    }

    /// Share an existing module registry, e.g. between several script
    /// services in one process.
    pub fn with_registry(registry: Arc<ModuleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }
}

impl Default for ScriptActionService {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionService for ScriptActionService {
    fn schema(&self) -> PropertySchema {
        PropertySchema::new()
            .scalar("script_file")
            .scalar("language")
            .list("args")
            .map("env")
    }

    fn can_create_action(&self, config: &ActionConfiguration) -> bool {
        config.scalar("script_file").is_some()
    }

    fn create_action(&self, config: ActionConfiguration) -> Result<Box<dyn Action>, ActionError> {
        Ok(Box::new(ScriptAction::new(config, self.registry.clone())?))
    }
}
