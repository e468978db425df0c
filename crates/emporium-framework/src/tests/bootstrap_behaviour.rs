//! Behavioural tests for framework assembly and the request bootstrap.

use std::cell::RefCell;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use url::form_urlencoded;

use emporium_config::StaticSettingsLoader;

use crate::action::{Outcome, RouteTable};
use crate::bootstrap::{BootstrapError, Components, Framework, Handled, Stage, bootstrap_with};
use crate::request::Request;
use crate::storefront;

use super::support::{HealthEvent, RecordingHealthReporter, TestSite};

type StepResult = Result<(), String>;

const STAGE_ORDER: [Stage; 16] = [
    Stage::Config,
    Stage::PreConfig,
    Stage::Faults,
    Stage::Events,
    Stage::Loader,
    Stage::Request,
    Stage::Database,
    Stage::Session,
    Stage::Cache,
    Stage::Url,
    Stage::Language,
    Stage::Document,
    Stage::Autoload,
    Stage::FrontController,
    Stage::Dispatch,
    Stage::Compression,
];

struct BootstrapWorld {
    site: TestSite,
    options: toml::Table,
    reporter: Arc<RecordingHealthReporter>,
    framework: Option<Framework>,
    assembly_error: Option<BootstrapError>,
    handled: Option<Result<Handled, BootstrapError>>,
}

impl BootstrapWorld {
    fn new() -> Self {
        Self {
            site: TestSite::new(),
            options: toml::Table::new(),
            reporter: Arc::new(RecordingHealthReporter::default()),
            framework: None,
            assembly_error: None,
            handled: None,
        }
    }

    fn set_option(&mut self, key: &str, value: impl Into<toml::Value>) {
        self.options.insert(key.to_owned(), value.into());
    }

    fn assemble(&mut self) {
        self.site.write_options("default", &self.options.to_string());
        let components = Components {
            routes: components_routes(),
            ..Components::default()
        };
        let loader = StaticSettingsLoader::new(self.site.settings());
        match bootstrap_with(&loader, self.reporter.clone(), components) {
            Ok(framework) => self.framework = Some(framework),
            Err(error) => self.assembly_error = Some(error),
        }
    }

    fn handle(&mut self, route: &str) -> StepResult {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("route", route)
            .finish();
        self.handle_query(&query)
    }

    fn handle_query(&mut self, query: &str) -> StepResult {
        if self.framework.is_none() {
            self.assemble();
        }
        let framework = self
            .framework
            .as_ref()
            .ok_or_else(|| format!("framework failed to assemble: {:?}", self.assembly_error))?;
        self.handled = Some(framework.handle(Request::from_query(query)));
        Ok(())
    }

    fn handled(&self) -> &Handled {
        match self.handled.as_ref() {
            Some(Ok(handled)) => handled,
            Some(Err(error)) => panic!("request failed: {error}"),
            None => panic!("no request was handled"),
        }
    }
}

fn components_routes() -> RouteTable {
    storefront::register(RouteTable::builder())
        .handle("account/login", "index", |_, _| Ok(Outcome::respond("login_form")))
        .handle("account/login", "pre_config", |ctx, _| {
            ctx.config_mut().set("session_autostart", true);
            Ok(Outcome::Continue)
        })
        .handle("extension/banner", "index", |_, args| {
            let output = args.first().and_then(|value| value.as_str()).unwrap_or_default();
            Ok(Outcome::Respond(format!("{output}<div class=\"banner\"></div>")))
        })
        .build()
        .expect("test routes should build")
}

#[fixture]
fn world() -> RefCell<BootstrapWorld> {
    RefCell::new(BootstrapWorld::new())
}

#[given("a site with default options")]
fn given_default_site(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().set_option("language_default", "en-gb");
}

#[given("the pre-config hook is enabled")]
fn given_pre_config(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().set_option("pre_config", true);
}

#[given("the default action is {route}")]
fn given_default_action(world: &RefCell<BootstrapWorld>, route: String) {
    world.borrow_mut().set_option("action_default", route);
}

#[given("the maintenance gate is switched on")]
fn given_maintenance(world: &RefCell<BootstrapWorld>) {
    let mut world = world.borrow_mut();
    world.set_option("action_pre_action", vec!["startup/maintenance"]);
    world.set_option("config_maintenance", true);
}

#[given("the pre-action {route} is configured")]
fn given_pre_action(world: &RefCell<BootstrapWorld>, route: String) {
    world
        .borrow_mut()
        .set_option("action_pre_action", vec![route]);
}

#[given("the database driver {driver} autostarts")]
fn given_database(world: &RefCell<BootstrapWorld>, driver: String) {
    let mut world = world.borrow_mut();
    world.set_option("db_autostart", true);
    world.set_option("db_engine", driver);
}

#[given("the after event for {route} is handled by {listener}")]
fn given_after_event(world: &RefCell<BootstrapWorld>, route: String, listener: String) {
    let mut events = toml::Table::new();
    events.insert(format!("controller/{route}/after"), toml::Value::from(listener));
    world.borrow_mut().set_option("action_event", events);
}

#[given("the default language titles the home page {title}")]
fn given_language(world: &RefCell<BootstrapWorld>, title: String) {
    let mut strings = toml::Table::new();
    strings.insert(String::from("heading_title"), toml::Value::from(title));
    world
        .borrow()
        .site
        .write_language("en-gb", "en-gb", &strings.to_string());
}

#[when("the framework is assembled")]
fn when_assembled(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().assemble();
}

#[when("a request for {route} is handled")]
fn when_handled(world: &RefCell<BootstrapWorld>, route: String) -> StepResult {
    world.borrow_mut().handle(&route)
}

#[when("a request without a route parameter is handled")]
fn when_handled_without_route(world: &RefCell<BootstrapWorld>) -> StepResult {
    world.borrow_mut().handle_query("")
}

#[when("a request with an empty route parameter is handled")]
fn when_handled_with_empty_route(world: &RefCell<BootstrapWorld>) -> StepResult {
    world.borrow_mut().handle_query("route=")
}

#[then("the bootstrap stages complete in order")]
fn then_stage_order(world: &RefCell<BootstrapWorld>) {
    assert_eq!(world.borrow().reporter.stages(), STAGE_ORDER.to_vec());
}

#[then("dispatch completes with status {status}")]
fn then_dispatch_status(world: &RefCell<BootstrapWorld>, status: u16) {
    let world = world.borrow();
    assert_eq!(world.handled().response.status(), status);
    assert!(
        world
            .reporter
            .events()
            .contains(&HealthEvent::DispatchCompleted(status))
    );
}

#[then("the response sets a session cookie")]
fn then_session_cookie(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    let cookie = world
        .handled()
        .response
        .header("Set-Cookie")
        .expect("session cookie should be set");
    assert!(cookie.starts_with("EMPORIUMSESSID="), "cookie: {cookie}");
}

#[then("the response does not set a session cookie")]
fn then_no_session_cookie(world: &RefCell<BootstrapWorld>) {
    assert!(world.borrow().handled().response.header("Set-Cookie").is_none());
}

#[then("the response body contains {text}")]
fn then_body_contains(world: &RefCell<BootstrapWorld>, text: String) {
    let world = world.borrow();
    let output = world.handled().response.output();
    assert!(output.contains(&text), "output: {output}");
}

#[then("assembly fails naming {route}")]
fn then_assembly_fails(world: &RefCell<BootstrapWorld>, route: String) {
    let world = world.borrow();
    let error = world
        .assembly_error
        .as_ref()
        .expect("assembly should fail");
    assert!(
        matches!(error, BootstrapError::UnresolvedRoute { route: failed, .. } if *failed == route),
        "error: {error}"
    );
    assert!(world.reporter.events().iter().any(|event| matches!(
        event,
        HealthEvent::BootstrapFailed(message) if message.contains(&route)
    )));
}

#[then("the request fails for want of a {driver} connector")]
fn then_missing_connector(world: &RefCell<BootstrapWorld>, driver: String) {
    let world = world.borrow();
    let Some(Err(error)) = world.handled.as_ref() else {
        panic!("request should fail");
    };
    assert!(
        matches!(error, BootstrapError::MissingDatabaseConnector { driver: missing } if *missing == driver),
        "error: {error}"
    );
    assert!(
        !world.reporter.stages().contains(&Stage::Database),
        "database stage should not complete"
    );
}

#[scenario(path = "tests/features/bootstrap.feature")]
fn bootstrap(#[from(world)] world: RefCell<BootstrapWorld>) {
    drop(world);
}
