//! Robot-control client.
//! Forwards a move plus the full board grid to the local robot endpoint.
//! The reply is logged and otherwise ignored.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::debug;
use reqwest::Client;
use serde::Serialize;

use crate::board::Board;

const TIMEOUT_SECS: u64 = 10;

#[derive(Serialize)]
struct RobotCommand<'a> {
    #[serde(rename = "movimiento")]
    mv: &'a str,
    #[serde(rename = "estado_tablero")]
    board: Vec<Vec<char>>,
}

#[derive(Clone)]
pub struct RobotClient {
    client: Client,
    url: String,
}

impl RobotClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(RobotClient { client, url: url.to_string() })
    }

    pub async fn send_move(&self, mv: &str, board: &Board) -> Result<()> {
        let command = RobotCommand { mv, board: board.grid() };
        let response = self
            .client
            .post(&self.url)
            .json(&command)
            .send()
            .await
            .context("Failed to reach the robot endpoint")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("Robot endpoint error {}: {}", status, body);
        }
        debug!("robot replied: {}", body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_wire_format() {
        let command = RobotCommand { mv: "e2e4", board: Board::initial().grid() };
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["movimiento"], json!("e2e4"));
        // Cells travel as one-character strings.
        assert_eq!(value["estado_tablero"][0][0], json!("r"));
        assert_eq!(value["estado_tablero"][4][4], json!("."));
        assert_eq!(value["estado_tablero"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    #[ignore = "requires the robot endpoint on localhost"]
    async fn test_real_robot_call() {
        let robot = RobotClient::new(&crate::config::Config::default().robot_url).unwrap();
        robot.send_move("e2e4", &Board::initial()).await.unwrap();
    }
}
