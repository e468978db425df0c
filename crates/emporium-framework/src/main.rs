//! CGI entry point serving the storefront.

use std::env;
use std::io::{self, Read};
use std::process::ExitCode;
use std::sync::Arc;

use emporium_config::SystemSettingsLoader;
use emporium_framework::{
    Components, INTERNAL_ERROR_PAGE, Rendered, Request, Response, RouteTable,
    StructuredHealthReporter, bootstrap_with, storefront,
};

fn main() -> ExitCode {
    let rendered = match serve() {
        Ok(rendered) => rendered,
        Err(message) => {
            eprintln!("emporium: {message}");
            fallback_page()
        }
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match rendered.write_cgi(&mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("emporium: failed to write response: {error}");
            ExitCode::FAILURE
        }
    }
}

fn serve() -> Result<Rendered, String> {
    let routes = storefront::register(RouteTable::builder())
        .build()
        .map_err(|error| error.to_string())?;
    let components = Components {
        routes,
        ..Components::default()
    };
    let framework = bootstrap_with(
        &SystemSettingsLoader,
        Arc::new(StructuredHealthReporter::new()),
        components,
    )
    .map_err(|error| error.to_string())?;

    let mut request = Request::from_cgi_env(env::vars());
    if request.method() == "POST" {
        let mut body = String::new();
        let limit = env::var("CONTENT_LENGTH")
            .ok()
            .and_then(|length| length.parse::<u64>().ok())
            .unwrap_or_default();
        io::stdin()
            .take(limit)
            .read_to_string(&mut body)
            .map_err(|error| format!("failed to read request body: {error}"))?;
        request = request.with_form_body(&body);
    }

    let handled = framework.handle(request).map_err(|error| error.to_string())?;
    Ok(handled.render())
}

fn fallback_page() -> Rendered {
    let mut response = Response::new();
    response.set_status(500);
    response.set_output(INTERNAL_ERROR_PAGE);
    response.render(false)
}
