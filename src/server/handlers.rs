//! HTTP request handlers

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::training::{EstimatorSelection, Hyperparameters};
use crate::utils::DataLoader;
use crate::workflow::{predict_action, train_action, ScalingPolicy, TrainOutcome, TrainRequest};

use super::error::{Result, ServerError};
use super::state::AppState;

// ============================================================================
// Form parsing
// ============================================================================

/// Multipart body: one CSV file plus plain text fields
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("file").to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or("data.csv").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.to_string()))?;
                info!(file = %file_name, bytes = data.len(), "Received upload");
                form.file = Some(data.to_vec());
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.to_string()))?;
                // Checkbox groups repeat the field name
                form.fields
                    .entry(name)
                    .and_modify(|v| {
                        v.push(',');
                        v.push_str(&value);
                    })
                    .or_insert(value);
            }
        }
        Ok(form)
    }

    fn take_file(&mut self) -> Result<Vec<u8>> {
        self.file
            .take()
            .ok_or_else(|| ServerError::BadRequest("No file uploaded".to_string()))
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.text(name)
            .map(|v| {
                v.parse::<T>().map_err(|_| {
                    ServerError::BadRequest(format!("invalid value '{}' for {}", v, name))
                })
            })
            .transpose()
    }

    fn train_request(&self) -> Result<TrainRequest> {
        let selection = match self.text("estimators") {
            Some(codes) => EstimatorSelection::from_str(codes)?,
            None => EstimatorSelection::new(),
        };

        let mut hp = Hyperparameters::default();
        if let Some(v) = self.parse("rf_n_estimators")? {
            hp.rf_n_estimators = v;
        }
        if let Some(v) = self.parse("rf_max_depth")? {
            hp.rf_max_depth = v;
        }
        if let Some(v) = self.parse("gb_n_estimators")? {
            hp.gb_n_estimators = v;
        }
        if let Some(v) = self.parse("gb_max_depth")? {
            hp.gb_max_depth = v;
        }
        if let Some(v) = self.parse("mlp_max_iter")? {
            hp.mlp_max_iter = v;
        }
        if let Some(v) = self.parse("mlp_alpha")? {
            hp.mlp_alpha = v;
        }

        let request = TrainRequest::new(selection, hp);
        Ok(match self.parse::<u64>("seed")? {
            Some(seed) => request.with_seed(seed),
            None => request,
        })
    }
}

// ============================================================================
// API Handlers
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_trained": state.store.exists(),
    }))
}

/// Train on the uploaded table and replace the stored model
pub async fn train(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<TrainOutcome>> {
    let mut form = UploadForm::read(multipart).await?;
    let bytes = form.take_file()?;
    let request = form.train_request()?;

    let _guard = state.train_lock.lock().await;
    let store = state.store.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let df = DataLoader::new().load_csv_bytes(bytes)?;
        train_action(&df, &request, &store)
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    *state.last_training.write().await = Some(outcome.clone());
    Ok(Json(outcome))
}

/// Evaluation of the last model trained by this server
pub async fn get_evaluation(State(state): State<Arc<AppState>>) -> Result<Json<TrainOutcome>> {
    state
        .last_training
        .read()
        .await
        .clone()
        .map(Json)
        .ok_or_else(|| ServerError::NotFound("No evaluation yet. Train a model first.".to_string()))
}

/// Classify the uploaded table and return `predictions.csv`
pub async fn predict(State(state): State<Arc<AppState>>, multipart: Multipart) -> Result<Response> {
    let mut form = UploadForm::read(multipart).await?;
    let bytes = form.take_file()?;
    let scaling = match form.text("scaling") {
        Some(v) => ScalingPolicy::from_str(v)?,
        None => ScalingPolicy::default(),
    };

    let store = state.store.clone();
    let csv = tokio::task::spawn_blocking(move || {
        let df = DataLoader::new().load_csv_bytes(bytes)?;
        predict_action(&df, &store, scaling)?.to_csv()
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"predictions.csv\""),
        ],
        csv,
    )
        .into_response())
}

// ============================================================================
// UI Handler
// ============================================================================

pub async fn serve_index() -> Html<&'static str> {
    Html(EMBEDDED_INDEX_HTML)
}

const EMBEDDED_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>ExoSeeker</title>
    <script defer src="https://cdn.jsdelivr.net/npm/alpinejs@3.x.x/dist/cdn.min.js"></script>
    <script src="https://cdn.tailwindcss.com"></script>
    <style>[x-cloak]{display:none!important}</style>
</head>
<body class="bg-gray-900 text-gray-100 min-h-screen" x-data="app()">
    <header class="bg-gray-800 border-b border-gray-700 px-6 py-4">
        <div class="flex items-center justify-between">
            <h1 class="text-xl font-bold">ExoSeeker</h1>
            <span class="text-sm text-gray-400">Kepler KOI disposition classifier</span>
        </div>
    </header>
    <main class="p-6 grid grid-cols-3 gap-6">
        <section class="bg-gray-800 rounded-lg p-6">
            <h2 class="text-lg font-semibold mb-4">Training Data</h2>
            <input type="file" accept=".csv" x-ref="trainFile" class="mb-4 text-sm">
            <div class="space-y-2 mb-4">
                <label class="flex items-center gap-2"><input type="checkbox" checked disabled> Random Forest</label>
                <label class="flex items-center gap-2"><input type="checkbox" x-model="est.gb"> Gradient Boosting</label>
                <label class="flex items-center gap-2"><input type="checkbox" x-model="est.mlp"> Multi-Layer Perceptron</label>
            </div>
            <div class="grid grid-cols-2 gap-2 text-sm mb-4">
                <label>RF trees<input type="number" min="1" x-model="hp.rf_n_estimators" class="w-full bg-gray-700 rounded p-1"></label>
                <label>RF depth<input type="number" min="1" x-model="hp.rf_max_depth" class="w-full bg-gray-700 rounded p-1"></label>
                <label x-show="est.gb">GB trees<input type="number" min="1" x-model="hp.gb_n_estimators" class="w-full bg-gray-700 rounded p-1"></label>
                <label x-show="est.gb">GB depth<input type="number" min="1" x-model="hp.gb_max_depth" class="w-full bg-gray-700 rounded p-1"></label>
                <label x-show="est.mlp">MLP epochs<input type="number" min="1" x-model="hp.mlp_max_iter" class="w-full bg-gray-700 rounded p-1"></label>
                <label x-show="est.mlp">MLP alpha<input type="number" step="0.0001" min="0" x-model="hp.mlp_alpha" class="w-full bg-gray-700 rounded p-1"></label>
            </div>
            <button @click="train()" :disabled="busy" class="px-6 py-2 bg-blue-600 hover:bg-blue-700 disabled:bg-gray-600 rounded">
                <span x-show="!busy">Train</span><span x-show="busy">Working...</span>
            </button>
        </section>
        <section class="bg-gray-800 rounded-lg p-6">
            <h2 class="text-lg font-semibold mb-4">Evaluation</h2>
            <template x-if="result">
                <div>
                    <table class="w-full text-sm mb-4">
                        <tr><td>Accuracy</td><td x-text="pct(result.report.metrics.accuracy)"></td></tr>
                        <tr><td>Sensitivity</td><td x-text="pct(result.report.metrics.sensitivity)"></td></tr>
                        <tr><td>Specificity</td><td x-text="pct(result.report.metrics.specificity)"></td></tr>
                        <tr><td>Precision</td><td x-text="pct(result.report.metrics.precision)"></td></tr>
                        <tr><td>F1 Score</td><td x-text="result.report.metrics.f1.toFixed(4)"></td></tr>
                    </table>
                    <div class="grid grid-cols-2 gap-2 text-center text-sm">
                        <template x-for="cell in result.report.confusion_matrix.cells.flat()">
                            <div class="bg-gray-700 rounded p-3">
                                <div x-text="cell.name" class="text-gray-400"></div>
                                <div class="text-xl font-bold" x-text="cell.count"></div>
                                <div x-text="pct(cell.normalized)"></div>
                            </div>
                        </template>
                    </div>
                </div>
            </template>
            <p x-show="!result" class="text-gray-400 text-sm">Train a model to see its evaluation.</p>
        </section>
        <section class="bg-gray-800 rounded-lg p-6">
            <h2 class="text-lg font-semibold mb-4">Target Data</h2>
            <input type="file" accept=".csv" x-ref="predictFile" class="mb-4 text-sm">
            <label class="flex items-center gap-2 mb-4 text-sm"><input type="checkbox" x-model="batchScaling"> Scale with batch statistics</label>
            <button @click="predict()" :disabled="busy" class="px-6 py-2 bg-green-600 hover:bg-green-700 disabled:bg-gray-600 rounded">Predict &amp; Download</button>
        </section>
        <div x-show="error" x-cloak class="col-span-3 bg-red-900 text-red-100 rounded p-4" x-text="error"></div>
    </main>
    <script>
    function app() {
        return {
            busy: false, error: null, result: null, batchScaling: false,
            est: { gb: false, mlp: false },
            hp: { rf_n_estimators: 100, rf_max_depth: 3, gb_n_estimators: 100, gb_max_depth: 3, mlp_max_iter: 100, mlp_alpha: 0.0001 },
            pct(v) { return (v * 100).toFixed(2) + '%'; },
            async init() {
                const r = await fetch('/api/evaluation');
                if (r.ok) this.result = await r.json();
            },
            async train() {
                const file = this.$refs.trainFile.files[0];
                if (!file) { this.error = 'Choose a training CSV first.'; return; }
                const form = new FormData();
                form.append('file', file);
                const codes = ['rf'];
                if (this.est.gb) codes.push('gb');
                if (this.est.mlp) codes.push('mlp');
                form.append('estimators', codes.join(','));
                for (const [k, v] of Object.entries(this.hp)) form.append(k, v);
                await this.send('/api/train', form, async r => { this.result = await r.json(); });
            },
            async predict() {
                const file = this.$refs.predictFile.files[0];
                if (!file) { this.error = 'Choose a target CSV first.'; return; }
                const form = new FormData();
                form.append('file', file);
                form.append('scaling', this.batchScaling ? 'batch' : 'training');
                await this.send('/api/predict', form, async r => {
                    const url = URL.createObjectURL(await r.blob());
                    const a = document.createElement('a');
                    a.href = url; a.download = 'predictions.csv'; a.click();
                    URL.revokeObjectURL(url);
                });
            },
            async send(url, form, onOk) {
                this.busy = true; this.error = null;
                try {
                    const r = await fetch(url, { method: 'POST', body: form });
                    if (r.ok) await onOk(r); else this.error = (await r.json()).message;
                } catch (e) { this.error = String(e); }
                this.busy = false;
            },
        };
    }
    </script>
</body>
</html>
"#;
