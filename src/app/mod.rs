use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::Context as _;
use eframe::egui::{self, Context, Sense};
use log::{error, info};

use graphflux::{Dataset, EngineConfig, GraphEngine, parse_dataset};

mod canvas;
mod interaction;
mod panels;

use canvas::{EguiSceneRenderer, draw_background};
use interaction::CanvasInput;

type LoadResult = Result<Dataset, String>;

pub struct GraphFluxApp {
    dataset_path: PathBuf,
    config: EngineConfig,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<Viewer>),
    Error(String),
}

struct Viewer {
    engine: GraphEngine,
    renderer: EguiSceneRenderer,
    input: CanvasInput,
    dataset_label: String,
    target_fps: f32,
}

fn read_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    parse_dataset(&raw).with_context(|| format!("failed to parse dataset {}", path.display()))
}

impl GraphFluxApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        dataset_path: PathBuf,
        config: EngineConfig,
    ) -> Self {
        let state = AppState::Loading {
            rx: Self::spawn_load(dataset_path.clone()),
        };
        Self {
            dataset_path,
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(dataset_path: PathBuf) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = read_dataset(&dataset_path).map_err(|err| format!("{err:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn ready_state(&self, dataset: Dataset) -> AppState {
        match GraphEngine::new(self.config.clone()) {
            Ok(mut engine) => {
                engine.load(dataset);
                AppState::Ready(Box::new(Viewer {
                    target_fps: engine.performance_snapshot().target_fps,
                    engine,
                    renderer: EguiSceneRenderer::default(),
                    input: CanvasInput::default(),
                    dataset_label: self.dataset_path.display().to_string(),
                }))
            }
            Err(err) => AppState::Error(err.to_string()),
        }
    }
}

impl Viewer {
    fn show(&mut self, ctx: &Context, reload_requested: &mut bool, is_loading: bool) {
        self.show_top_bar(ctx, reload_requested, is_loading);
        self.show_controls(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let response = ui.allocate_rect(rect, Sense::click_and_drag());
                self.input.handle(ui, rect, &response, &mut self.engine);

                let dt = ui.input(|input| input.stable_dt);
                let dt = Duration::try_from_secs_f32(dt).unwrap_or_default();
                self.engine.frame_with_delta(dt, &mut self.renderer);

                let painter = ui.painter_at(rect);
                let viewport = self.engine.viewport();
                draw_background(&painter, rect, viewport.offset(), viewport.scale());
                self.renderer.paint(&painter, rect);
            });

        if self.engine.simulation_state().running && !self.engine.simulation_state().paused {
            ctx.request_repaint();
        }
    }

    /// Swaps in a freshly loaded dataset, keeping the camera.
    fn reload(&mut self, dataset: Dataset) {
        let summary = self.engine.load(dataset);
        info!(
            "reloaded {}: {} nodes, {} edges",
            self.dataset_label, summary.accepted_nodes, summary.accepted_edges
        );
    }
}

impl eframe::App for GraphFluxApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(result);
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading graph dataset...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(message) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load graph dataset");
                    ui.add_space(6.0);
                    ui.label(message.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
                if retry {
                    self.state = AppState::Loading {
                        rx: Self::spawn_load(self.dataset_path.clone()),
                    };
                }
            }
            AppState::Ready(viewer) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                viewer.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.dataset_path.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(dataset)) => viewer.reload(dataset),
                        Ok(Err(message)) => {
                            error!("reload failed: {message}");
                            self.state = AppState::Error(message);
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            self.state =
                                AppState::Error("Background load worker disconnected".to_owned());
                        }
                    }
                }
            }
        }

        if let Some(result) = transition {
            self.state = match result {
                Ok(dataset) => self.ready_state(dataset),
                Err(message) => {
                    error!("load failed: {message}");
                    AppState::Error(message)
                }
            };
        } else if matches!(self.state, AppState::Loading { .. }) {
            ctx.request_repaint();
        }
    }
}
