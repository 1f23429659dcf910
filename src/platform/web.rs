//! Browser bindings
//!
//! JSON in, JSON out: the page owns one `WebScene` per mount target and
//! hands it viewport, flags and signal whenever one of them changes.

use wasm_bindgen::prelude::*;

use crate::engine::{MountedScene, SceneEngine};
use crate::layout::compose::ComposeRequest;
use crate::platform::{ModeFlags, Viewport};
use crate::tuning::LayoutConfig;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    // A second init (e.g. hot reload) is harmless
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("Scene layout loaded");
}

#[wasm_bindgen]
pub struct WebScene {
    scene: MountedScene,
}

#[wasm_bindgen]
impl WebScene {
    /// Build from a JSON `LayoutConfig`, or the built-in tables
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WebScene, JsError> {
        let engine = match config_json {
            Some(json) => SceneEngine::from_json_str(&json)?,
            None => SceneEngine::with_defaults()?,
        };
        Ok(WebScene {
            scene: MountedScene::new(engine),
        })
    }

    /// Compose and return the `Composition` as JSON
    pub fn compose(
        &mut self,
        signal: f64,
        width: f64,
        height: f64,
        questionnaire_open: bool,
        overlay: bool,
    ) -> Result<String, JsError> {
        let request = ComposeRequest::new(
            signal,
            Viewport::new(width, height),
            ModeFlags {
                questionnaire_open,
                overlay,
            },
        );
        let composition = self.scene.recompose(&request);
        Ok(serde_json::to_string(composition)?)
    }

    /// Compose from a JSON `ComposeRequest` (allows an explicit salt)
    #[wasm_bindgen(js_name = composeRequest)]
    pub fn compose_request(&mut self, request_json: &str) -> Result<String, JsError> {
        let request: ComposeRequest = serde_json::from_str(request_json)?;
        let composition = self.scene.recompose(&request);
        Ok(serde_json::to_string(composition)?)
    }

    /// Current pool as JSON
    #[wasm_bindgen(js_name = poolJson)]
    pub fn pool_json(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(self.scene.pool())?)
    }

    pub fn reset(&mut self) {
        self.scene.reset();
    }

    #[wasm_bindgen(js_name = defaultConfigJson)]
    pub fn default_config_json() -> Result<String, JsError> {
        Ok(LayoutConfig::default().to_json_string()?)
    }
}
