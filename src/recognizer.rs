//! Image-recognition client.
//! Uploads a board photo to the prediction service as a multipart form and
//! gets back an 8x8 grid of cell strings. Latency: one network round trip,
//! typically 1-4s on a cold cloud function.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::debug;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

const TIMEOUT_SECS: u64 = 60; // Cloud function cold starts are slow
const UPLOAD_FIELD: &str = "file";
const UPLOAD_FILENAME: &str = "captura.jpg";

// *************** Response Types ***************

#[derive(Deserialize)]
struct PredictionResponse {
    board: Vec<Vec<String>>,
}

// *************** Client ***************

#[derive(Clone)]
pub struct Recognizer {
    client: Client,
    url: String,
}

impl Recognizer {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Recognizer { client, url: url.to_string() })
    }

    /// Uploads JPEG bytes and returns the raw digitized grid. Shape and
    /// symbol validation happen later, in `Board::from_grid`.
    pub async fn digitize(&self, image: Vec<u8>) -> Result<Vec<Vec<String>>> {
        let part = Part::bytes(image)
            .file_name(UPLOAD_FILENAME)
            .mime_str("image/jpeg")
            .context("Failed to build upload part")?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .context("Failed to send image to the recognition service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Recognition service error {}: {}", status, body);
        }

        let parsed: PredictionResponse = response
            .json()
            .await
            .context("Recognition response has no board grid")?;
        debug!("recognizer returned {} rows", parsed.board.len());
        Ok(parsed.board)
    }
}

// *************** Tests ***************
