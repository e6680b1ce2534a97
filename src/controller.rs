use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::catalog::{
    default_substance, substance_by_id, Substance, TemperatureRange, DEFAULT_TEMP,
    TEMPERATURE_RANGE, TEMPERATURE_STEP,
};
use crate::config::ExplanationConfig;
use crate::density::{substance_density, water_density, WaterPhase};
use crate::diagrams::{
    lake_profile, molecule_layout, LakeProfile, MoleculeLayout, SUBSTANCE_REFERENCE_DENSITY,
    WATER_REFERENCE_DENSITY,
};
use crate::explanation::{TextGenerator, PLACEHOLDER_TEXT};
use crate::fetcher::{CancelHandle, ExplanationEvent, ExplanationFetcher};
use crate::series::{cached_series, SampleSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControllerPhase {
    Idle,
    ExplanationLoading,
}

/// Mutable session state, owned by `ViewController` only.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub current_temperature: f64,
    pub selected_substance: &'static Substance,
    pub explanation_text: String,
    pub is_explanation_loading: bool,
}

impl Default for SimulationState {
    fn default() -> Self {
        SimulationState {
            current_temperature: DEFAULT_TEMP,
            selected_substance: default_substance(),
            explanation_text: PLACEHOLDER_TEXT.to_string(),
            is_explanation_loading: false,
        }
    }
}

/// Everything the rendering layer needs for one frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub current_temperature: f64,
    pub water_density: f64,
    pub substance_density: f64,
    pub selected_substance: Substance,
    pub chart_series: Arc<SampleSeries>,
    pub explanation_text: String,
    pub is_explanation_loading: bool,
    pub phase: ControllerPhase,
    pub water_phase: WaterPhase,
    pub water_molecules: MoleculeLayout,
    pub substance_molecules: MoleculeLayout,
    pub lake: LakeProfile,
    pub temperature_range: TemperatureRange,
    pub temperature_step: f64,
}

pub struct ViewController<G: TextGenerator> {
    state: SimulationState,
    water_density: f64,
    substance_density: f64,
    series: Arc<SampleSeries>,
    fetcher: ExplanationFetcher<G>,
    events: mpsc::UnboundedReceiver<ExplanationEvent>,
    pending: Option<CancelHandle>,
    /// Only events from this generation may touch the state
    active_generation: Option<u64>,
}

impl<G: TextGenerator> ViewController<G> {
    pub fn new(client: G, config: &ExplanationConfig) -> Self {
        let (fetcher, events) = ExplanationFetcher::new(client, config);
        let state = SimulationState::default();
        let series = series_for(state.selected_substance);
        let mut controller = ViewController {
            state,
            water_density: 0.0,
            substance_density: 0.0,
            series,
            fetcher,
            events,
            pending: None,
            active_generation: None,
        };
        controller.derive();
        controller
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn water_density(&self) -> f64 {
        self.water_density
    }

    pub fn substance_density(&self) -> f64 {
        self.substance_density
    }

    pub fn series(&self) -> &Arc<SampleSeries> {
        &self.series
    }

    pub fn phase(&self) -> ControllerPhase {
        if self.state.is_explanation_loading {
            ControllerPhase::ExplanationLoading
        } else {
            ControllerPhase::Idle
        }
    }

    /// Requests the explanation for the starting temperature.
    pub fn start(&mut self) {
        self.request_explanation();
    }

    /// Clamps `t` into the supported range and applies it. Returns whether
    /// the temperature changed; non-finite input is ignored.
    pub fn set_temperature(&mut self, t: f64) -> bool {
        if !t.is_finite() {
            debug!(t, "ignoring non-finite temperature");
            return false;
        }
        let clamped = TEMPERATURE_RANGE.clamp(t);
        if clamped == self.state.current_temperature {
            return false;
        }
        self.state.current_temperature = clamped;
        self.derive();
        self.request_explanation();
        true
    }

    /// Selects a catalog substance by id. Unknown ids leave the state as is.
    pub fn set_substance(&mut self, id: &str) -> bool {
        let Some(substance) = substance_by_id(id) else {
            debug!(id, "ignoring unknown substance");
            return false;
        };
        if substance.id == self.state.selected_substance.id {
            return false;
        }
        self.state.selected_substance = substance;
        self.series = series_for(substance);
        self.derive();
        // the prompt does not mention the substance, but a new selection still
        // refreshes the explanation
        self.request_explanation();
        true
    }

    /// Drops any pending or in-flight explanation request.
    pub fn cancel_explanation(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
        self.active_generation = None;
        self.state.is_explanation_loading = false;
    }

    /// Waits for the next fetcher event. Pair with `apply_event`.
    pub async fn next_event(&mut self) -> Option<ExplanationEvent> {
        self.events.recv().await
    }

    /// Applies a fetcher event unless it belongs to a superseded request.
    pub fn apply_event(&mut self, event: ExplanationEvent) -> bool {
        if Some(event.generation()) != self.active_generation {
            debug!(generation = event.generation(), "discarding stale explanation event");
            return false;
        }
        match event {
            ExplanationEvent::Loading { .. } => {
                self.state.is_explanation_loading = true;
            }
            ExplanationEvent::Ready { text, .. } | ExplanationEvent::Failed { text, .. } => {
                self.state.explanation_text = text;
                self.state.is_explanation_loading = false;
                self.pending = None;
            }
            ExplanationEvent::Cancelled { .. } => {
                self.state.is_explanation_loading = false;
                self.active_generation = None;
                self.pending = None;
            }
        }
        true
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let t = self.state.current_temperature;
        let water_phase = WaterPhase::at(t);
        ViewSnapshot {
            current_temperature: t,
            water_density: self.water_density,
            substance_density: self.substance_density,
            selected_substance: self.state.selected_substance.clone(),
            chart_series: Arc::clone(&self.series),
            explanation_text: self.state.explanation_text.clone(),
            is_explanation_loading: self.state.is_explanation_loading,
            phase: self.phase(),
            water_phase,
            water_molecules: molecule_layout(
                self.water_density,
                WATER_REFERENCE_DENSITY,
                water_phase.is_ice(),
            ),
            substance_molecules: molecule_layout(
                self.substance_density,
                SUBSTANCE_REFERENCE_DENSITY,
                false,
            ),
            lake: lake_profile(t),
            temperature_range: TEMPERATURE_RANGE,
            temperature_step: TEMPERATURE_STEP,
        }
    }

    fn derive(&mut self) {
        let t = self.state.current_temperature;
        self.water_density = water_density(t);
        self.substance_density = substance_density(self.state.selected_substance, t);
    }

    fn request_explanation(&mut self) {
        let handle = self.fetcher.request_explanation(self.state.current_temperature);
        self.active_generation = Some(handle.generation());
        // anything still in flight was just aborted by the fetcher
        self.state.is_explanation_loading = false;
        self.pending = Some(handle);
    }
}

fn series_for(substance: &Substance) -> Arc<SampleSeries> {
    match cached_series(substance, TEMPERATURE_RANGE, TEMPERATURE_STEP) {
        Ok(series) => series,
        Err(err) => {
            warn!(substance = substance.id, error = %err, "cannot build chart series");
            Arc::new(SampleSeries {
                substance_id: substance.id,
                range: TEMPERATURE_RANGE,
                step: TEMPERATURE_STEP,
                peak_marker: crate::density::WATER_PEAK_TEMP_C,
                samples: Vec::new(),
            })
        }
    }
}
