//! Engine evaluation client.
//! Posts the serialized board to the external engine service and gets back
//! a best move in coordinate notation plus an evaluation string: either a
//! signed score ("+1.20", decimal comma tolerated) or a mate descriptor
//! ("Mate en 2"). The mate scan is a plain string heuristic over the
//! service's human-readable output; only mate-in-1 ends the game.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::board::Board;

const TIMEOUT_SECS: u64 = 30;
const MATE_MARKER: &str = "Mate en";

// *************** Request/Response Types ***************

#[derive(Serialize)]
struct AnalysisRequest {
    #[serde(rename = "tablero")]
    board: Vec<String>,
}

#[derive(Deserialize)]
struct AnalysisResponse {
    #[serde(rename = "mejor_movimiento")]
    best_move: String,
    #[serde(rename = "evaluacion")]
    evaluation: String,
}

/// Best move plus the evaluation exactly as the service phrased it.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub best_move: String,
    pub evaluation: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Evaluation {
    /// Score from the engine's point of view, pawns.
    Score(f64),
    MateIn(u32),
}

impl Evaluation {
    pub fn is_mate_in_one(self) -> bool {
        self == Evaluation::MateIn(1)
    }
}

/// Classifies the evaluation string. A string carrying the mate marker has
/// its digits pulled out, defaulting to 1 when none survive; anything else
/// parses as a number, 0.0 on failure.
pub fn parse_evaluation(raw: &str) -> Evaluation {
    if raw.contains(MATE_MARKER) {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        let n = digits.parse::<u32>().ok().filter(|&n| n > 0).unwrap_or(1);
        Evaluation::MateIn(n)
    } else {
        Evaluation::Score(raw.replace(',', ".").parse().unwrap_or(0.0))
    }
}

// *************** Client ***************

#[derive(Clone)]
pub struct EngineClient {
    client: Client,
    url: String,
}

impl EngineClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(EngineClient { client, url: url.to_string() })
    }

    pub async fn analyze(&self, board: &Board) -> Result<Analysis> {
        let request = AnalysisRequest { board: board.wire_rows() };
        debug!("sending position to engine: {:?}", request.board);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context("Failed to send position to the engine service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Engine service error {}: {}", status, body);
        }

        let parsed: AnalysisResponse = response
            .json()
            .await
            .context("Engine response has no best move")?;
        debug!(
            "engine replied: move '{}', evaluation '{}'",
            parsed.best_move, parsed.evaluation
        );
        Ok(Analysis { best_move: parsed.best_move, evaluation: parsed.evaluation })
    }
}

// *************** Tests ***************
