//! Minimal wiretap example: a weather-forecast API behind the audit
//! middleware, with a toy authentication stage that trusts `x-user-id`.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/api/weatherforecast
//!   curl -X POST http://localhost:3000/api/weatherforecast \
//!        -H 'content-type: application/json' -H 'x-user-id: 7' \
//!        -d '{"temperatureC":21,"summary":"Mild"}'
//!
//! Every exchange produces two `wiretap::audit` log lines.

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wiretap::middleware::{Audit, Middleware};
use wiretap::{BoxFuture, Error, Exchange, Handler, Server, handler_fn};

const SUMMARIES: [&str; 10] = [
    "Freezing", "Bracing", "Chilly", "Cool", "Mild", "Warm", "Balmy", "Hot", "Sweltering", "Scorching",
];

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct WeatherForecast {
    #[serde(default)]
    days_ahead: u32,
    temperature_c: i32,
    summary: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("WIRETAP_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned());

    // Header auth runs first, so the audit records see the user.
    let app = handler_fn(weather)
        .with(Audit::tracing())
        .with(HeaderAuth);

    Server::bind(&addr)?.serve(app).await
}

// /api/weatherforecast
//
// GET returns five forecasts; POST validates one and answers 200 with no body.
fn weather(ex: &mut Exchange) -> BoxFuture<'_, Result<(), Error>> {
    Box::pin(async move {
        if ex.request().path() != "/api/weatherforecast" {
            ex.response_mut().set_status(StatusCode::NOT_FOUND);
            return Ok(());
        }

        let method = ex.request().method().clone();
        match method {
            Method::GET => {
                let forecasts: Vec<WeatherForecast> = (1..=5)
                    .map(|day| WeatherForecast {
                        days_ahead: day,
                        temperature_c: (day as i32 * 13) % 75 - 20,
                        summary: Some(SUMMARIES[day as usize * 3 % SUMMARIES.len()].to_owned()),
                    })
                    .collect();
                ex.response_mut().write_json(&forecasts).await
            }
            Method::POST => {
                // The audit middleware has already read this body; it rewound it.
                let mut body = Vec::new();
                ex.request_mut().body_mut().read_to_end(&mut body).await?;
                if serde_json::from_slice::<WeatherForecast>(&body).is_err() {
                    ex.response_mut().set_status(StatusCode::BAD_REQUEST);
                }
                Ok(())
            }
            _ => {
                ex.response_mut().set_status(StatusCode::METHOD_NOT_ALLOWED);
                Ok(())
            }
        }
    })
}

/// Copies `x-user-id` into the request context. A stand-in for real auth.
struct HeaderAuth;

impl Middleware for HeaderAuth {
    fn handle<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        next: &'a dyn Handler,
    ) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            if let Some(user) = exchange.request().header("x-user-id").map(str::to_owned) {
                exchange.request_mut().context_mut().set_user(user);
            }
            next.call(exchange).await
        })
    }
}
