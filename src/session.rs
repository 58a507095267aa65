//! Interactive session.
//! Single-threaded event loop multiplexing typed commands, the auto-capture
//! ticker and completions of in-flight recognition requests. Recognition
//! runs as detached tasks reporting over a channel: replies are applied in
//! arrival order with no sequencing and no cancellation, so a reply from a
//! stale capture still lands when it returns.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task;
use tokio::time::{self, MissedTickBehavior};

use crate::board::{self, Board, BoardEvent, BoardState, Move};
use crate::capture;
use crate::config::Config;
use crate::engine::{self, EngineClient};
use crate::mode::GameMode;
use crate::recognizer::Recognizer;
use crate::robot::RobotClient;
use crate::rules;

type DigitizedResult = Result<Vec<Vec<String>>>;
type DigitizedSender = mpsc::UnboundedSender<DigitizedResult>;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Command {
    Move(Move),
    Upload(String),
    Capture,
    Record,
    Mode,
    Reset,
    Show,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Command::Empty;
    };
    match head.to_ascii_lowercase().as_str() {
        "upload" => match words.next() {
            Some(path) => Command::Upload(path.to_string()),
            None => Command::Unknown(line.to_string()),
        },
        "capture" => Command::Capture,
        "record" => Command::Record,
        "mode" => Command::Mode,
        "reset" => Command::Reset,
        "show" => Command::Show,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => match Move::from_coordinates(head) {
            Ok(mv) => Command::Move(mv),
            Err(_) => Command::Unknown(line.to_string()),
        },
    }
}

/// Which color a typed move is checked against: the human is pinned to
/// White against the engine, two-person entry alternates.
fn local_side_is_white(mode: GameMode, white_to_move: bool) -> bool {
    match mode {
        GameMode::PlayerVsEngine => true,
        _ => white_to_move,
    }
}

fn print_help() {
    println!("Commands:");
    println!("  e2e4            enter a move (origin + destination)");
    println!("  upload <path>   digitize an image file");
    println!("  capture         grab one frame from the screen");
    println!("  record          toggle auto-capture");
    println!("  mode            cycle Player / Engine / Player vs engine");
    println!("  reset           back to the initial position");
    println!("  show            print the board");
    println!("  quit            leave");
}

pub struct Session {
    state: BoardState,
    mode: GameMode,
    white_to_move: bool,
    recognizer: Recognizer,
    engine: EngineClient,
    robot: RobotClient,
    config: Config,
    /// Cleared after the first capture failure; capture and record stay
    /// refused for the rest of the session.
    camera_ok: bool,
    recording: bool,
    game_over: bool,
}

impl Session {
    pub fn new(config: Config, mode: GameMode) -> Result<Self> {
        Ok(Session {
            state: BoardState::new(),
            mode,
            white_to_move: true,
            recognizer: Recognizer::new(&config.recognizer_url)?,
            engine: EngineClient::new(&config.engine_url)?,
            robot: RobotClient::new(&config.robot_url)?,
            config,
            camera_ok: true,
            recording: false,
            game_over: false,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut ticker =
            time::interval(Duration::from_secs(self.config.capture_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        println!("Mode: {}", self.mode);
        self.render();
        print_help();
        self.prompt();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read from stdin")? else {
                        break;
                    };
                    if !self.handle_command(line.trim(), &tx).await {
                        break;
                    }
                    self.prompt();
                }
                _ = ticker.tick() => {
                    if self.recording && self.camera_ok {
                        self.capture_and_digitize(&tx).await;
                    }
                }
                Some(result) = rx.recv() => {
                    self.handle_digitized(result).await;
                    self.prompt();
                }
            }
        }
        Ok(())
    }

    /// Returns false when the session should end.
    async fn handle_command(&mut self, line: &str, tx: &DigitizedSender) -> bool {
        match parse_command(line) {
            Command::Empty => {}
            Command::Quit => return false,
            Command::Help => print_help(),
            Command::Show => {
                self.render();
                println!("Mode: {}", self.mode);
            }
            Command::Reset => {
                self.state = BoardState::new();
                self.white_to_move = true;
                self.game_over = false;
                self.render();
                self.notice("Board reset to the initial position");
            }
            Command::Mode => {
                self.mode = self.mode.next();
                self.white_to_move = true;
                self.notice(&format!("Mode changed to: {}", self.mode));
            }
            Command::Record => {
                if !self.camera_ok {
                    self.notice_err("Camera is disabled for this session");
                } else if self.recording {
                    self.recording = false;
                    self.notice("Auto-capture stopped");
                } else {
                    self.recording = true;
                    self.notice(&format!(
                        "Auto-capture on: one frame every {} seconds",
                        self.config.capture_interval_secs
                    ));
                    self.capture_and_digitize(tx).await;
                }
            }
            Command::Capture => {
                if !self.camera_ok {
                    self.notice_err("Camera is disabled for this session");
                } else {
                    self.capture_and_digitize(tx).await;
                }
            }
            Command::Upload(path) => match capture::load_image_file(&path) {
                Ok(bytes) => self.spawn_digitize(bytes, tx),
                Err(e) => self.notice_err(&format!("{:#}", e)),
            },
            Command::Move(mv) => self.handle_local_move(mv).await,
            Command::Unknown(input) => {
                self.notice_err(&format!("Unrecognized command '{}'; try 'help'", input));
            }
        }
        true
    }

    /// Grabs one frame. The grab itself runs to completion here (it is
    /// local and fast); only the recognition round trip is detached.
    async fn capture_and_digitize(&mut self, tx: &DigitizedSender) {
        let bounds = self.config.capture_bounds;
        match task::spawn_blocking(move || capture::grab_frame(bounds)).await {
            Ok(Ok(bytes)) => self.spawn_digitize(bytes, tx),
            Ok(Err(e)) => {
                self.camera_ok = false;
                self.recording = false;
                self.notice_err(&format!("{:#}. Camera features disabled", e));
            }
            Err(e) => warn!("capture task aborted: {}", e),
        }
    }

    fn spawn_digitize(&self, image: Vec<u8>, tx: &DigitizedSender) {
        let recognizer = self.recognizer.clone();
        let tx = tx.clone();
        task::spawn(async move {
            // The receiver only disappears when the session is over.
            let _ = tx.send(recognizer.digitize(image).await);
        });
        println!("Digitizing image...");
    }

    async fn handle_digitized(&mut self, result: DigitizedResult) {
        let grid = match result {
            Ok(grid) => grid,
            Err(e) => {
                self.notice_err(&format!("{:#}", e));
                return;
            }
        };
        let board = match Board::from_grid(&grid) {
            Ok(board) => board,
            Err(e) => {
                self.notice_err(&format!("{:#}", e));
                return;
            }
        };
        let (state, event) = self.state.apply_digitized(board);
        self.state = state;
        if event == BoardEvent::MoveDetected {
            self.notice("Move detected!");
        } else {
            debug!("digitized board matches the previous snapshot");
        }
        self.render();
        self.notice("Board updated");
        if self.mode == GameMode::EngineAuto {
            self.engine_reply().await;
        }
    }

    async fn handle_local_move(&mut self, mv: Move) {
        if !self.mode.accepts_move_entry() {
            debug!("move entry ignored in {} mode", self.mode);
            return;
        }
        if self.game_over {
            self.notice_err("The game is over; 'reset' starts a new one");
            return;
        }

        let white = local_side_is_white(self.mode, self.white_to_move);
        let piece = self.state.board().get(mv.from);
        if piece == board::EMPTY {
            self.notice_err("Illegal move: the origin square is empty");
            return;
        }
        if piece.is_ascii_uppercase() != white {
            self.notice_err("You cannot move your opponent's pieces");
            return;
        }
        if !rules::is_legal(self.state.board(), white, mv) {
            self.notice_err("Illegal move");
            return;
        }
        let state = match self.state.apply_local_move(mv) {
            Ok(state) => state,
            Err(e) => {
                self.notice_err(&format!("{:#}", e));
                return;
            }
        };
        self.state = state;
        self.render();
        self.notice(&format!("Move: {}", mv));

        match self.mode {
            GameMode::Player => {
                self.forward_to_robot(&mv.to_string()).await;
                self.white_to_move = !white;
            }
            GameMode::PlayerVsEngine => self.engine_reply().await,
            GameMode::EngineAuto => {}
        }
    }

    /// Asks the engine for the best move on the current board, applies it
    /// and forwards it to the robot. Used by both engine-driven modes.
    async fn engine_reply(&mut self) {
        let analysis = match self.engine.analyze(self.state.board()).await {
            Ok(analysis) => analysis,
            Err(e) => {
                debug!("engine request failed: {:#}", e);
                self.notice_err("Could not get the best move");
                return;
            }
        };
        println!("Best move: {}", analysis.best_move);
        println!("Evaluation: {}", analysis.evaluation);

        match self.state.apply_engine_move(&analysis.best_move) {
            Ok((state, Some(mv))) => {
                self.state = state;
                self.render();
                self.notice(&format!("Engine played: {}", analysis.best_move));
                self.forward_to_robot(&mv.to_string()).await;
            }
            Ok((_, None)) => {}
            Err(e) => {
                self.notice_err(&format!("Engine reply could not be applied: {:#}", e));
                return;
            }
        }

        if engine::parse_evaluation(&analysis.evaluation).is_mate_in_one() {
            self.game_over = true;
            println!("================");
            println!("   Checkmate!");
            println!("================");
            self.notice("Game over; 'reset' starts a new one");
        }
    }

    async fn forward_to_robot(&mut self, mv: &str) {
        match self.robot.send_move(mv, self.state.board()).await {
            Ok(()) => self.notice("Move sent to the robot"),
            Err(e) => {
                debug!("robot request failed: {:#}", e);
                self.notice_err("Robot communication failed");
            }
        }
    }

    fn render(&self) {
        println!();
        println!("{}", self.state.board());
        println!();
    }

    /// Transient notices; the terminal scrolls them away on its own.
    fn notice(&self, message: &str) {
        println!(">> {}", message);
    }

    fn notice_err(&self, message: &str) {
        eprintln!("!! {}", message);
    }

    fn prompt(&self) {
        print!("turkboard> ");
        let _ = std::io::stdout().flush();
    }
}
