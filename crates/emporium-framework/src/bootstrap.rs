//! Framework assembly and the per-request bootstrap sequence.
//!
//! [`bootstrap_with`] runs once per process: it loads settings, installs
//! telemetry, and validates the configured routes against the route table.
//! [`Framework::handle`] then builds a fresh [`Context`] for every request
//! in a fixed stage order, dispatches it, and returns the response. A stage
//! may rely on every earlier stage being complete.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use emporium_config::{Settings, SettingsLoader, SitePaths};
use ortho_config::OrthoError;
use serde_json::json;
use strum::Display;
use thiserror::Error;
use tracing::{debug, warn};

use crate::action::{Action, RouteTable, event_routes};
use crate::config_table::{ConfigError, ConfigTable};
use crate::context::Context;
use crate::faults::{Fault, FaultHandler, Severity};
use crate::front::{DispatchReport, FrontController};
use crate::health::HealthReporter;
use crate::loader::{LoadError, Loader, ResourceCatalog};
use crate::request::{ROUTE_PARAMETER, Request};
use crate::response::{Rendered, Response};
use crate::route::RouteId;
use crate::services::{
    Cache, CacheBackend, DEFAULT_BACKEND, DEFAULT_EXPIRE, DEFAULT_LANGUAGE, DatabaseConnector,
    DatabaseError, DbParams, Document, Language, MemoryCacheBackend, MemorySessionStore, Session,
    SessionError, SessionStore, Url,
};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Tracing target for bootstrap diagnostics.
const BOOTSTRAP_TARGET: &str = "emporium::bootstrap";

/// Route used when `action_router` is not configured.
pub const DEFAULT_ROUTER: &str = "startup/router";
/// Route used when `action_error` is not configured.
pub const DEFAULT_ERROR: &str = "error/not_found";
/// Session engine used when `session_engine` is not configured.
pub const DEFAULT_SESSION_ENGINE: &str = "memory";
/// Cookie name used when `session_name` is not configured.
pub const DEFAULT_SESSION_NAME: &str = "EMPORIUMSESSID";

/// Option file loaded for every application.
const DEFAULT_OPTIONS: &str = "default";
/// Controller method invoked by the pre-config hook.
const PRE_CONFIG_METHOD: &str = "pre_config";

/// Bootstrap stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Option files loaded.
    Config,
    /// Pre-config hook ran or was skipped.
    PreConfig,
    /// Fault handler configured.
    Faults,
    /// Configured event listeners registered.
    Events,
    /// Loader attached.
    Loader,
    /// Request stored and response created.
    Request,
    /// Database connected or skipped.
    Database,
    /// Session started or skipped.
    Session,
    /// Cache attached.
    Cache,
    /// Link builder attached or skipped.
    Url,
    /// Default language loaded.
    Language,
    /// Document created.
    Document,
    /// Autoloads finished.
    Autoload,
    /// Front controller assembled.
    FrontController,
    /// Dispatch finished.
    Dispatch,
    /// Compression level applied.
    Compression,
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Process settings failed to load.
    #[error("failed to load settings: {source}")]
    Settings {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// An option file failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying config error.
        #[source]
        source: ConfigError,
    },
    /// A configured route does not resolve.
    #[error("configured route '{route}' for {key} does not resolve")]
    UnresolvedRoute {
        /// Config key naming the route.
        key: String,
        /// Route as configured.
        route: String,
    },
    /// No connector is registered for the configured driver.
    #[error("no database connector registered for driver '{driver}'")]
    MissingDatabaseConnector {
        /// Configured driver.
        driver: String,
    },
    /// The database could not be opened.
    #[error("failed to connect to the database: {source}")]
    Database {
        /// Driver error.
        #[source]
        source: DatabaseError,
    },
    /// No session store is registered for the configured engine.
    #[error("unknown session engine '{engine}'")]
    SessionEngine {
        /// Configured engine.
        engine: String,
    },
    /// The session could not be started.
    #[error("failed to start the session: {source}")]
    Session {
        /// Store error.
        #[source]
        source: SessionError,
    },
    /// No cache backend is registered for the configured type.
    #[error("unknown cache type '{kind}'")]
    Cache {
        /// Configured cache type.
        kind: String,
    },
    /// The default language failed to load.
    #[error("failed to load language: {source}")]
    Language {
        /// Loader error.
        #[source]
        source: LoadError,
    },
    /// An autoload entry failed.
    #[error("failed to autoload {kind} '{name}': {source}")]
    Autoload {
        /// Autoload list the entry came from.
        kind: &'static str,
        /// Entry name.
        name: String,
        /// Loader error.
        #[source]
        source: LoadError,
    },
}

/// Engines selected by name from the config table.
#[derive(Clone)]
pub struct Collaborators {
    databases: HashMap<String, Arc<dyn DatabaseConnector>>,
    session_stores: HashMap<String, Arc<dyn SessionStore>>,
    cache_backends: HashMap<String, Arc<dyn CacheBackend>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        let mut session_stores: HashMap<String, Arc<dyn SessionStore>> = HashMap::new();
        session_stores.insert(
            String::from(DEFAULT_SESSION_ENGINE),
            Arc::new(MemorySessionStore::new()),
        );
        let mut cache_backends: HashMap<String, Arc<dyn CacheBackend>> = HashMap::new();
        cache_backends.insert(
            String::from(DEFAULT_BACKEND),
            Arc::new(MemoryCacheBackend::new()),
        );
        Self {
            databases: HashMap::new(),
            session_stores,
            cache_backends,
        }
    }
}

impl Collaborators {
    /// Registers a database connector under a driver name.
    #[must_use]
    pub fn with_database(mut self, driver: impl Into<String>, connector: Arc<dyn DatabaseConnector>) -> Self {
        self.databases.insert(driver.into(), connector);
        self
    }

    /// Registers a session store under an engine name.
    #[must_use]
    pub fn with_session_store(mut self, engine: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        self.session_stores.insert(engine.into(), store);
        self
    }

    /// Registers a cache backend under a type name.
    #[must_use]
    pub fn with_cache_backend(mut self, kind: impl Into<String>, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache_backends.insert(kind.into(), backend);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Collaborators")
            .field("databases", &self.databases.keys().collect::<Vec<_>>())
            .field("session_stores", &self.session_stores.keys().collect::<Vec<_>>())
            .field("cache_backends", &self.cache_backends.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Application code plugged into the framework.
#[derive(Debug, Default)]
pub struct Components {
    /// Controllers.
    pub routes: RouteTable,
    /// Library and model factories.
    pub catalog: ResourceCatalog,
    /// Named engines.
    pub collaborators: Collaborators,
}

/// Outcome of one handled request.
#[derive(Debug)]
pub struct Handled {
    /// Final response.
    pub response: Response,
    /// Dispatch trace.
    pub report: DispatchReport,
    /// Faults recorded during the request.
    pub faults: Vec<Fault>,
    /// The client accepts brotli.
    pub accepts_br: bool,
}

impl Handled {
    /// Renders the response with the negotiated encoding.
    #[must_use]
    pub fn render(&self) -> Rendered {
        self.response.render(self.accepts_br)
    }
}

/// Assembled framework, ready to serve requests.
pub struct Framework {
    settings: Settings,
    paths: SitePaths,
    routes: Arc<RouteTable>,
    catalog: Arc<ResourceCatalog>,
    collaborators: Collaborators,
    reporter: Arc<dyn HealthReporter>,
    telemetry: Option<TelemetryHandle>,
}

impl std::fmt::Debug for Framework {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Framework")
            .field("settings", &self.settings)
            .field("routes", &self.routes)
            .field("collaborators", &self.collaborators)
            .finish_non_exhaustive()
    }
}

impl Framework {
    /// Assembles a framework and validates the configured routes.
    ///
    /// Every route named by `action_router`, `action_default`,
    /// `action_pre_action`, or `action_event` must resolve. An unresolvable
    /// `action_error` is logged; dispatch falls back to its built-in page.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Configuration`] when the option files
    /// cannot be loaded and [`BootstrapError::UnresolvedRoute`] for the
    /// first configured route that does not resolve.
    pub fn new(
        settings: Settings,
        components: Components,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<Self, BootstrapError> {
        let paths = settings.site_paths();
        let config = load_options(&paths, &settings)?;

        if let Some(unresolved) = components.routes.validate(&config).into_iter().next() {
            return Err(BootstrapError::UnresolvedRoute {
                key: unresolved.key,
                route: unresolved.route,
            });
        }
        let error_route = config.get_str("action_error").unwrap_or(DEFAULT_ERROR);
        if !components.routes.contains(error_route) {
            warn!(
                target: BOOTSTRAP_TARGET,
                route = error_route,
                "error route does not resolve; the built-in page will be used"
            );
        }

        reporter.framework_ready(&settings, components.routes.len());
        Ok(Self {
            settings,
            paths,
            routes: Arc::new(components.routes),
            catalog: Arc::new(components.catalog),
            collaborators: components.collaborators,
            reporter,
            telemetry: None,
        })
    }

    /// Resolved process settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Shared route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Telemetry handle, present when assembled through [`bootstrap_with`].
    #[must_use]
    pub const fn telemetry(&self) -> Option<TelemetryHandle> {
        self.telemetry
    }

    /// Serves one request.
    ///
    /// # Errors
    ///
    /// Returns a [`BootstrapError`] when a stage before dispatch fails.
    /// Failures during dispatch never surface here; they are recovered by
    /// the front controller.
    pub fn handle(&self, request: Request) -> Result<Handled, BootstrapError> {
        self.reporter.bootstrap_starting();
        match self.run_stages(request) {
            Ok(handled) => {
                self.reporter
                    .dispatch_completed(&handled.report, handled.response.status());
                Ok(handled)
            }
            Err(error) => {
                self.reporter.bootstrap_failed(&error);
                Err(error)
            }
        }
    }

    fn completed(&self, stage: Stage) {
        self.reporter.stage_completed(stage);
    }

    fn run_stages(&self, request: Request) -> Result<Handled, BootstrapError> {
        let config = load_options(&self.paths, &self.settings)?;
        let mut ctx = Context::new(Arc::clone(&self.routes), config).with_request(request);
        self.completed(Stage::Config);

        self.run_pre_config(&mut ctx);
        self.completed(Stage::PreConfig);

        ctx.faults = FaultHandler::from_config(&ctx.config);
        self.completed(Stage::Faults);

        for (key, route) in configured_events(&ctx.config) {
            ctx.events.register(key, Action::new(route));
        }
        self.completed(Stage::Events);

        ctx.loader = Loader::new(
            Arc::clone(&self.catalog),
            self.paths.clone(),
            self.settings.application,
        );
        self.completed(Stage::Loader);

        ctx.response = Response::new();
        self.completed(Stage::Request);

        if ctx.config.get_bool("db_autostart") {
            let params = DbParams::from_config(&ctx.config);
            let connector = self.collaborators.databases.get(&params.driver).ok_or_else(|| {
                BootstrapError::MissingDatabaseConnector {
                    driver: params.driver.clone(),
                }
            })?;
            let database = connector
                .connect(&params)
                .map_err(|source| BootstrapError::Database { source })?;
            ctx.database = Some(database);
        }
        self.completed(Stage::Database);

        if ctx.config.get_bool("session_autostart") {
            self.start_session(&mut ctx)?;
        }
        self.completed(Stage::Session);

        let kind = ctx.config.get_str("cache_type").unwrap_or(DEFAULT_BACKEND);
        let backend = self
            .collaborators
            .cache_backends
            .get(kind)
            .ok_or_else(|| BootstrapError::Cache {
                kind: kind.to_owned(),
            })?;
        let expire = ctx
            .config
            .get_int("cache_expire")
            .and_then(|seconds| u64::try_from(seconds).ok())
            .map_or(DEFAULT_EXPIRE, Duration::from_secs);
        ctx.cache = Cache::new(Arc::clone(backend), expire);
        self.completed(Stage::Cache);

        if ctx.config.get_bool("url_autostart") {
            let base = ctx.config.get_str("site_base").unwrap_or_default();
            let ssl = ctx.config.get_str("site_ssl").unwrap_or(base);
            ctx.url = Some(Url::new(base, ssl));
        }
        self.completed(Stage::Url);

        let code = ctx
            .config
            .get_str("language_default")
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_owned();
        ctx.language = Language::new(code.clone());
        match ctx.load_language(&code) {
            Ok(()) => {}
            Err(error) if error.is_missing() => {
                debug!(target: BOOTSTRAP_TARGET, language = %code, "no default language file");
            }
            Err(source) => return Err(BootstrapError::Language { source }),
        }
        self.completed(Stage::Language);

        ctx.document = Document::default();
        self.completed(Stage::Document);

        run_autoloads(&mut ctx)?;
        self.completed(Stage::Autoload);

        let mut front = FrontController::new(self.settings.max_redirects);
        for route in ctx.config.get_str_list("action_pre_action") {
            front.add_pre_action(Action::new(route));
        }
        self.completed(Stage::FrontController);

        let router = Action::new(ctx.config.get_str("action_router").unwrap_or(DEFAULT_ROUTER));
        let error = Action::new(ctx.config.get_str("action_error").unwrap_or(DEFAULT_ERROR));
        let report = front.dispatch(&mut ctx, &router, &error);
        if let Some(Err(source)) = ctx.session.as_ref().map(Session::save) {
            ctx.report(Fault::new(Severity::Warning, source.to_string()).with_location("session"));
        }
        self.completed(Stage::Dispatch);

        let level = ctx
            .config
            .get_int("config_compression")
            .and_then(|level| u32::try_from(level).ok())
            .unwrap_or_default();
        ctx.response.set_compression(level);
        self.completed(Stage::Compression);

        let accepts_br = ctx.request.accepts_encoding("br");
        let Context {
            response, faults, ..
        } = ctx;
        Ok(Handled {
            response,
            report,
            faults: faults.into_recorded(),
            accepts_br,
        })
    }

    /// Lets the requested controller adjust the config before anything else
    /// starts. Failures are logged and ignored.
    fn run_pre_config(&self, ctx: &mut Context) {
        if !ctx.config.get_bool("pre_config") {
            return;
        }
        let Some(requested) = ctx.request.get(ROUTE_PARAMETER) else {
            return;
        };
        let raw = if requested.is_empty() {
            ctx.config.get_str("action_default").unwrap_or_default()
        } else {
            requested
        }
        .to_owned();
        let Some(route) = RouteId::sanitize(&raw) else {
            return;
        };
        let controller = if self.routes.is_controller(route.as_str()) {
            Some(route)
        } else {
            route
                .parent()
                .filter(|parent| self.routes.is_controller(parent.as_str()))
        };
        let Some(controller) = controller else {
            return;
        };

        let hook = controller.child(PRE_CONFIG_METHOD);
        if !self.routes.contains(hook.as_str()) {
            return;
        }
        let action = Action::with_args(hook.as_str(), vec![json!(raw)]);
        if let Err(error) = action.execute(ctx) {
            warn!(
                target: BOOTSTRAP_TARGET,
                route = hook.as_str(),
                error = %error,
                "pre-config hook failed"
            );
        }
    }

    fn start_session(&self, ctx: &mut Context) -> Result<(), BootstrapError> {
        let engine = ctx
            .config
            .get_str("session_engine")
            .unwrap_or(DEFAULT_SESSION_ENGINE);
        let store = self
            .collaborators
            .session_stores
            .get(engine)
            .ok_or_else(|| BootstrapError::SessionEngine {
                engine: engine.to_owned(),
            })?;
        let name = ctx
            .config
            .get_str("session_name")
            .unwrap_or(DEFAULT_SESSION_NAME)
            .to_owned();
        let session = Session::start(Arc::clone(store), ctx.request.cookie(&name))
            .map_err(|source| BootstrapError::Session { source })?;
        if session.is_new() {
            ctx.response
                .add_header("Set-Cookie", format!("{name}={}; Path=/; HttpOnly", session.id()));
        }
        ctx.session = Some(session);
        Ok(())
    }
}

/// Loads settings, installs telemetry, and assembles the framework.
///
/// # Errors
///
/// Returns a [`BootstrapError`] for the first step that fails. The reporter
/// hears about every failure.
pub fn bootstrap_with(
    loader: &dyn SettingsLoader,
    reporter: Arc<dyn HealthReporter>,
    components: Components,
) -> Result<Framework, BootstrapError> {
    let settings = match loader.load() {
        Ok(settings) => settings,
        Err(source) => {
            let error = BootstrapError::Settings { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&settings) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    match Framework::new(settings, components, Arc::clone(&reporter)) {
        Ok(mut framework) => {
            framework.telemetry = Some(telemetry);
            Ok(framework)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn load_options(paths: &SitePaths, settings: &Settings) -> Result<ConfigTable, BootstrapError> {
    let dir = paths.config();
    let mut config = ConfigTable::new();
    for name in [DEFAULT_OPTIONS, settings.application.dir_name()] {
        config
            .load(&dir, name)
            .map_err(|source| BootstrapError::Configuration { source })?;
    }
    Ok(config)
}

/// `action_event` entries as `(key, route)` pairs in file order.
fn configured_events(config: &ConfigTable) -> Vec<(String, String)> {
    config
        .get_table("action_event")
        .map(|events| {
            events
                .iter()
                .flat_map(|(key, value)| {
                    event_routes(value)
                        .into_iter()
                        .map(move |route| (key.clone(), route.to_owned()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn run_autoloads(ctx: &mut Context) -> Result<(), BootstrapError> {
    let autoload = |kind: &'static str, name: String, result: Result<(), LoadError>| {
        result.map_err(|source| BootstrapError::Autoload { kind, name, source })
    };
    for name in ctx.config.get_str_list("config_autoload") {
        let result = ctx.load_config(&name);
        autoload("config", name, result)?;
    }
    for name in ctx.config.get_str_list("language_autoload") {
        let result = ctx.load_language(&name);
        autoload("language", name, result)?;
    }
    for name in ctx.config.get_str_list("library_autoload") {
        let result = ctx.load_library(&name);
        autoload("library", name, result)?;
    }
    for name in ctx.config.get_str_list("model_autoload") {
        let result = ctx.load_model(&name);
        autoload("model", name, result)?;
    }
    Ok(())
}
