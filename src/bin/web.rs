use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use water_anomaly::catalog::{substance_by_id, SUBSTANCES, TEMPERATURE_RANGE, TEMPERATURE_STEP};
use water_anomaly::config::Config;
use water_anomaly::controller::ViewController;
use water_anomaly::gemini::GeminiClient;
use water_anomaly::series::cached_series;
use water_anomaly::session::{spawn_session, SessionError, SessionHandle};

#[derive(Clone)]
struct AppState {
    session: SessionHandle,
}

#[derive(Deserialize)]
struct TemperatureBody {
    temperature: f64,
}

#[derive(Deserialize)]
struct SubstanceBody {
    id: String,
}

#[derive(Deserialize)]
struct SeriesQuery {
    substance: Option<String>,
}

struct ApiError(SessionError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self.0, "session unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string()).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError(err)
    }
}

const INDEX_HTML: &str = r##"<!doctype html>
<html lang="sv">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Varför fryser inte sjöar från botten?</title>
    <style>
      body { margin: 0; padding: 24px; font-family: "Segoe UI", sans-serif; background: #f8fafc; color: #1e293b; }
      #panel { max-width: 420px; background: #fff; padding: 16px; border: 1px solid #e2e8f0; border-radius: 12px; }
      #explanation { margin-top: 16px; font-style: italic; min-height: 3em; }
      .row { display: flex; justify-content: space-between; margin-top: 6px; }
    </style>
  </head>
  <body>
    <div id="panel">
      <label>Jämför vatten med: <select id="substance"></select></label>
      <div class="row"><input id="temp" type="range" style="width: 100%" /></div>
      <div class="row"><span>Temperatur</span><strong id="tempValue"></strong></div>
      <div class="row"><span>Vatten</span><strong id="water"></strong></div>
      <div class="row"><span id="substanceName"></span><strong id="other"></strong></div>
      <div id="explanation"></div>
    </div>
    <script>
      const slider = document.getElementById("temp");
      const select = document.getElementById("substance");
      function render(s) {
        slider.min = s.temperatureRange.min;
        slider.max = s.temperatureRange.max;
        slider.step = s.temperatureStep;
        if (document.activeElement !== slider) slider.value = s.currentTemperature;
        select.value = s.selectedSubstance.id;
        document.getElementById("tempValue").textContent = s.currentTemperature.toFixed(1) + " °C";
        document.getElementById("water").textContent = s.waterDensity.toFixed(1) + " kg/m³";
        document.getElementById("substanceName").textContent = s.selectedSubstance.name;
        document.getElementById("other").textContent = s.substanceDensity.toFixed(1) + " kg/m³";
        document.getElementById("explanation").textContent = s.isExplanationLoading ? "..." : s.explanationText;
      }
      async function post(path, body) {
        const res = await fetch(path, { method: "POST", headers: { "Content-Type": "application/json" }, body: JSON.stringify(body) });
        render(await res.json());
      }
      async function poll() {
        const res = await fetch("/api/state");
        render(await res.json());
      }
      fetch("/api/substances").then(r => r.json()).then(list => {
        for (const s of list) {
          const opt = document.createElement("option");
          opt.value = s.id;
          opt.textContent = s.name;
          select.appendChild(opt);
        }
        poll();
        setInterval(poll, 500);
      });
      slider.addEventListener("input", () => post("/api/temperature", { temperature: parseFloat(slider.value) }));
      select.addEventListener("change", () => post("/api/substance", { id: select.value }));
    </script>
  </body>
</html>
"##;

async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

async fn substances() -> impl IntoResponse {
    Json(SUBSTANCES.to_vec())
}

async fn state(State(app): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(app.session.snapshot().await?))
}

async fn set_temperature(
    State(app): State<AppState>,
    Json(body): Json<TemperatureBody>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(app.session.set_temperature(body.temperature).await?))
}

async fn set_substance(
    State(app): State<AppState>,
    Json(body): Json<SubstanceBody>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(app.session.set_substance(body.id).await?))
}

async fn series(Query(q): Query<SeriesQuery>) -> Response {
    let id = q.substance.as_deref().unwrap_or(SUBSTANCES[0].id);
    let Some(substance) = substance_by_id(id) else {
        return (StatusCode::NOT_FOUND, format!("unknown substance {id}")).into_response();
    };
    match cached_series(substance, TEMPERATURE_RANGE, TEMPERATURE_STEP) {
        Ok(series) => Json(series).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    if config.explanation.api_key.is_none() {
        warn!("no GEMINI_API_KEY set; explanations will show the fallback text");
    }

    let client = GeminiClient::new(&config.explanation);
    let session = spawn_session(ViewController::new(client, &config.explanation));

    let app = Router::new()
        .route("/", get(index))
        .route("/api/substances", get(substances))
        .route("/api/state", get(state))
        .route("/api/temperature", post(set_temperature))
        .route("/api/substance", post(set_substance))
        .route("/api/series", get(series))
        .with_state(AppState { session });

    info!(addr = %config.addr, "serving water density explorer");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
