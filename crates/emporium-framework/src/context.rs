//! Request-scoped context passed to every handler.
//!
//! The context owns one request's services: nothing in it is shared with
//! another request except the frozen route table and the resource catalog
//! behind the loader.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::action::{RouteTable, panic_message};
use crate::config_table::ConfigTable;
use crate::event::{EventBus, EventResult};
use crate::faults::{Fault, FaultHandler};
use crate::loader::{Factory, LoadError, Loader, library_key, model_key};
use crate::registry::{Registry, RegistryError};
use crate::request::Request;
use crate::response::Response;
use crate::route::RouteId;
use crate::services::{Cache, Database, Document, Language, Session, Url};

/// Everything a handler can reach while serving one request.
pub struct Context {
    pub(crate) routes: Arc<RouteTable>,
    pub(crate) config: ConfigTable,
    pub(crate) events: EventBus,
    pub(crate) loader: Loader,
    pub(crate) request: Request,
    pub(crate) response: Response,
    pub(crate) faults: FaultHandler,
    pub(crate) language: Language,
    pub(crate) document: Document,
    pub(crate) cache: Cache,
    pub(crate) database: Option<Box<dyn Database>>,
    pub(crate) session: Option<Session>,
    pub(crate) url: Option<Url>,
    pub(crate) registry: Registry,
}

impl Context {
    /// Creates a context with default services around a route table and a
    /// config table.
    #[must_use]
    pub fn new(routes: Arc<RouteTable>, config: ConfigTable) -> Self {
        Self {
            routes,
            config,
            events: EventBus::new(),
            loader: Loader::default(),
            request: Request::default(),
            response: Response::new(),
            faults: FaultHandler::default(),
            language: Language::default(),
            document: Document::default(),
            cache: Cache::default(),
            database: None,
            session: None,
            url: None,
            registry: Registry::new(),
        }
    }

    /// Replaces the request.
    #[must_use]
    pub fn with_request(mut self, request: Request) -> Self {
        self.request = request;
        self
    }

    /// Replaces the loader.
    #[must_use]
    pub fn with_loader(mut self, loader: Loader) -> Self {
        self.loader = loader;
        self
    }

    /// Attaches a database handle.
    #[must_use]
    pub fn with_database(mut self, database: Box<dyn Database>) -> Self {
        self.database = Some(database);
        self
    }

    /// Shared route table.
    #[must_use]
    pub fn routes(&self) -> Arc<RouteTable> {
        Arc::clone(&self.routes)
    }

    /// Application config.
    #[must_use]
    pub const fn config(&self) -> &ConfigTable {
        &self.config
    }

    /// Mutable application config.
    pub fn config_mut(&mut self) -> &mut ConfigTable {
        &mut self.config
    }

    /// Event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Mutable event bus.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Resource loader.
    #[must_use]
    pub const fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Current request.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Response under construction.
    #[must_use]
    pub const fn response(&self) -> &Response {
        &self.response
    }

    /// Mutable response.
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Fault policy and record.
    #[must_use]
    pub const fn faults(&self) -> &FaultHandler {
        &self.faults
    }

    /// Loaded language strings.
    #[must_use]
    pub const fn language(&self) -> &Language {
        &self.language
    }

    /// Mutable language strings.
    pub fn language_mut(&mut self) -> &mut Language {
        &mut self.language
    }

    /// Page metadata.
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable page metadata.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Cache handle.
    #[must_use]
    pub const fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Database handle, when one was opened.
    pub fn database(&mut self) -> Option<&mut (dyn Database + 'static)> {
        self.database.as_deref_mut()
    }

    /// Session, when one was started.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Mutable session.
    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Link builder, when enabled.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Extension services.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable extension services.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Hands a fault to the fault handler and queues any display markup on
    /// the response.
    pub fn report(&mut self, fault: Fault) {
        if let Some(html) = self.faults.report(fault) {
            self.response.add_notice(html);
        }
    }

    /// Fires `key` on the event bus.
    pub fn trigger(&mut self, key: &str, args: &[Value]) -> Vec<EventResult> {
        EventBus::trigger(self, key, args)
    }

    /// Merges the option file `name` into the config table.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when the file is missing or malformed.
    pub fn load_config(&mut self, name: &str) -> Result<(), LoadError> {
        let dir = self.loader.paths().config();
        self.config.load(&dir, name)?;
        Ok(())
    }

    /// Merges the language file `name` into the language strings.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when the file is missing or malformed.
    pub fn load_language(&mut self, name: &str) -> Result<(), LoadError> {
        let table = self.loader.read_language(self.language.code(), name)?;
        self.language.merge(table);
        Ok(())
    }

    /// Builds the library `name` and stores it in the registry under its
    /// final path segment.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when no factory exists or it fails.
    pub fn load_library(&mut self, name: &str) -> Result<(), LoadError> {
        let route = RouteId::sanitize(name).ok_or_else(|| LoadError::unknown("library", name))?;
        let factory = self.loader.library_factory(&route)?;
        let instance = self.build("library", &route, &factory)?;
        let key = library_key(&route);
        debug!(target: "emporium::loader", library = route.as_str(), key = %key, "library loaded");
        self.registry.set_boxed(key, instance);
        Ok(())
    }

    /// Builds the model at `route` unless it is already loaded, storing it
    /// under `model_<route>`.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when no factory exists or it fails.
    pub fn load_model(&mut self, route: &str) -> Result<(), LoadError> {
        let route = RouteId::sanitize(route).ok_or_else(|| LoadError::unknown("model", route))?;
        let key = model_key(&route);
        if self.registry.has(&key) {
            return Ok(());
        }
        let factory = self.loader.model_factory(&route)?;
        let instance = self.build("model", &route, &factory)?;
        debug!(target: "emporium::loader", model = route.as_str(), key = %key, "model loaded");
        self.registry.set_boxed(key, instance);
        Ok(())
    }

    /// Runs `factory`, turning a panic into [`LoadError::Panicked`].
    fn build(
        &mut self,
        kind: &'static str,
        route: &RouteId,
        factory: &Factory,
    ) -> Result<Box<dyn Any>, LoadError> {
        panic::catch_unwind(AssertUnwindSafe(|| factory(self))).unwrap_or_else(|payload| {
            Err(LoadError::Panicked {
                kind,
                name: route.to_string(),
                message: panic_message(payload.as_ref()),
            })
        })
    }

    /// Loaded model at `route`.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] when the model is not loaded or has
    /// another type.
    pub fn model<T: 'static>(&self, route: &str) -> Result<&T, RegistryError> {
        let route = RouteId::sanitize(route).ok_or_else(|| RegistryError::not_found(route))?;
        self.registry.get::<T>(&model_key(&route))
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Context")
            .field("routes", &self.routes)
            .field("request", &self.request)
            .field("response_status", &self.response.status())
            .field("registry", &self.registry)
            .field("database", &self.database.is_some())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faults::Severity;
    use crate::loader::ResourceCatalog;
    use crate::services::MockDatabase;

    #[derive(Debug, PartialEq)]
    struct ProductModel {
        currency: String,
    }

    fn context_with_catalog(catalog: ResourceCatalog) -> Context {
        let loader = Loader::new(
            Arc::new(catalog),
            emporium_config::SitePaths::new("."),
            emporium_config::Application::Catalog,
        );
        Context::new(Arc::new(RouteTable::default()), ConfigTable::new()).with_loader(loader)
    }

    #[test]
    fn models_load_once_under_their_registry_key() {
        let catalog = ResourceCatalog::builder()
            .model("catalog/product", |ctx: &mut Context| {
                let currency = ctx.config().get_str("config_currency").unwrap_or("USD").to_owned();
                Ok(ProductModel { currency })
            })
            .build();
        let mut ctx = context_with_catalog(catalog);
        ctx.config_mut().set("config_currency", "EUR");

        ctx.load_model("catalog/product").expect("load");
        ctx.config_mut().set("config_currency", "GBP");
        ctx.load_model("catalog/product").expect("already loaded");

        let model = ctx.model::<ProductModel>("catalog/product").expect("stored");
        assert_eq!(model.currency, "EUR");
        assert!(ctx.registry().has("model_catalog_product"));
    }

    #[test]
    fn libraries_are_stored_under_their_last_segment() {
        let catalog = ResourceCatalog::builder()
            .library("cart/currency", |_: &mut Context| Ok(String::from("EUR")))
            .build();
        let mut ctx = context_with_catalog(catalog);
        ctx.load_library("cart/currency").expect("load");
        assert_eq!(ctx.registry().get::<String>("currency").map(String::as_str), Ok("EUR"));
        assert!(matches!(
            ctx.load_library("cart/tax"),
            Err(LoadError::Unknown { kind: "library", .. })
        ));
    }

    #[test]
    fn displayed_faults_become_response_notices() {
        let mut ctx = Context::new(Arc::new(RouteTable::default()), ConfigTable::new());
        ctx.faults = FaultHandler::new(false, true);
        ctx.report(Fault::new(Severity::Warning, "low stock"));
        let rendered = ctx.response().render(false);
        assert_eq!(rendered.body, b"<b>Warning</b>: low stock");
        assert_eq!(ctx.faults().recorded().len(), 1);
    }

    #[test]
    fn database_handle_is_reachable_when_attached() {
        let mut db = MockDatabase::new();
        db.expect_escape().returning(|value| value.replace('\'', "\\'"));
        let mut ctx = Context::new(Arc::new(RouteTable::default()), ConfigTable::new())
            .with_database(Box::new(db));
        let escaped = ctx.database().map(|db| db.escape("O'Brien"));
        assert_eq!(escaped.as_deref(), Some("O\\'Brien"));
    }
}
